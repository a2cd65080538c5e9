pub(crate) mod analytics;
pub(crate) mod commits;
pub(crate) mod connect;
pub(crate) mod disconnect;
pub(crate) mod migrate;
pub(crate) mod shared;
pub(crate) mod status;
pub(crate) mod sync;
