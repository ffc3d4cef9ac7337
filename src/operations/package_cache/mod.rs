pub(crate) mod disk;
pub(crate) mod fauna;
pub(crate) mod in_memory;
