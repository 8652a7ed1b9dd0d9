pub mod app_config;
pub mod device;
pub mod entity;
pub mod extensions;
pub mod mapping;
pub mod spec;
pub mod value;

#[cfg(test)]
pub(crate) mod test_support;
