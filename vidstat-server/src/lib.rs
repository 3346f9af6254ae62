pub mod handler;
pub mod http;
pub mod telegram;

#[cfg(test)]
pub(crate) mod testing;
