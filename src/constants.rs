/// Descriptor format version written by `extract`
/// Any version string is accepted on `create`
pub const FORMAT_VERSION: &str = "1";

/// File name of the JSON descriptor inside an extracted directory
pub const DEFAULT_DESCRIPTOR_FILE_NAME: &str = "ptimer.json";

/// Conventional extension of a container file
pub const CONTAINER_EXTENSION: &str = "ptimer";

/// SQLite page size used for new containers
/// Containers are small and written once, so a small page keeps files compact
pub const CONTAINER_PAGE_SIZE: u32 = 1024;
