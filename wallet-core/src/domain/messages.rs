//! User-facing message catalogue
//!
//! Texts shown through the view's transient message area and the busy
//! indicator. Kept in one place so flows and tests agree on the wording.

// Busy indicator
pub const LOADING_DEFAULT: &str = "処理中...";
pub const LOADING_AUTO_LOGIN: &str = "自動ログイン中...";
pub const LOADING_LOGIN: &str = "ログイン中...";
pub const LOADING_REGISTER: &str = "アカウント作成中...";
pub const LOADING_POST_LOGIN: &str = "データ読み込み中...";
pub const LOADING_CHECK_PIN: &str = "PIN確認中...";
pub const LOADING_VERIFY_PIN: &str = "PIN認証中...";
pub const LOADING_TRANSFER: &str = "送金処理中...";

// Errors
pub const UNEXPECTED_ERROR: &str = "予期せぬエラーが発生しました";
pub const GENERIC_ERROR: &str = "エラーが発生しました";
pub const PASSWORD_MISMATCH: &str = "パスワードが一致しません";
pub const PIN_MISMATCH: &str = "PINコードが一致しません";
pub const PIN_FORMAT: &str = "PINコードは4桁の数字で入力してください";
pub const LOGIN_REQUIRED: &str = "ログインが必要です";
pub const SOURCE_MISSING: &str = "送金元が指定されていません";
pub const SOURCE_PIN_NOT_SET: &str = "送金元アカウントのPINが設定されていません";
pub const PAYMENT_NOT_FOUND: &str = "送金情報が見つかりません";
pub const WRONG_PIN: &str = "PINコードが正しくありません";
pub const AMOUNT_TOO_SMALL: &str = "送金額は1W以上を指定してください";
pub const SELF_TRANSFER: &str = "自分自身には送金できません";
pub const INSUFFICIENT_BALANCE: &str = "残高が不足しています";

// Notices
pub const ACCOUNT_CREATED: &str = "アカウントが作成されました。ログインしてください。";
pub const LOGGED_OUT: &str = "ログアウトしました";
pub const TRANSFER_COMPLETED: &str = "送金が完了しました";
pub const NETWORK_ONLINE: &str = "ネットワーク接続が回復しました";
pub const NETWORK_OFFLINE: &str = "ネットワーク接続が切断されました";

/// Greeting shown after a manual login
pub fn welcome(username: &str) -> String {
    format!("ようこそ、{}さん", username)
}
