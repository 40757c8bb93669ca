pub(crate) mod edx;
pub(crate) mod oauth;
