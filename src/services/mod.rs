pub mod channel_service;
pub mod hooks;
pub mod spade_service;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;
