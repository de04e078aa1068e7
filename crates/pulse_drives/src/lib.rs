pub mod biosensor_cache;
pub mod drive;
pub mod persistence;
pub mod sensors;

pub use biosensor_cache::BiosensorCache;
pub use drive::{Drive, DriveEngine, DriveSnapshot};
pub use sensors::{ConversationSensor, FilesystemSensor, Sensor, SensorSnapshot, SystemSensor};
