//! Location port - the page address the client was opened with

/// Current address and navigation
pub trait Location: Send + Sync {
    /// Account named by the `from` parameter of a deep-link payment request
    ///
    /// Empty values count as absent.
    fn deep_link_source(&self) -> Option<String>;

    /// Drop every parameter and go back to the base path
    ///
    /// The presentation layer treats this as a fresh page load.
    fn navigate_to_base(&self);

    /// Whether a deep-link payment request is present
    fn has_deep_link(&self) -> bool {
        self.deep_link_source().is_some()
    }
}
