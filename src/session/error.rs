use crate::client::ClientError;
use crate::domain_port::TokenStoreError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("token store error: {0}")]
    Store(#[from] TokenStoreError),
    #[error("login rejected with status {status}")]
    LoginRejected { status: u16 },
    #[error("login response did not include both tokens")]
    MalformedLogin,
}
