pub mod completion;
pub mod db;
pub mod identity;
pub mod session;
pub mod token;

pub use completion::OpenAiCompletionAdapter;
pub use db::DbAdapter;
pub use identity::PasswordIdentityAdapter;
pub use session::SignedSessionAdapter;
pub use token::TokenSigner;
