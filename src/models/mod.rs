pub mod gql;
pub mod payload;
pub mod settings;
pub mod stream;
