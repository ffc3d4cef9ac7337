pub(crate) mod read_through;
pub(crate) mod remote;
