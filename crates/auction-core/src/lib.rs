pub mod gateway;
pub mod protocol;
pub mod validator;
