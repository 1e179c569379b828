// Service exports
pub mod device;
pub mod places;
pub mod sessions;
pub mod store;

pub use device::{
    DeviceLocation, DeviceRegistry, DeviceReport, PermissionStatus, RegisteredDevice, ReportedDeviceLocation,
};
pub use places::{GooglePlacesClient, PlacePhoto, PlaceSearch, PlacesError, GOOGLE_MAPS_API_URL};
pub use sessions::{SessionEntry, SessionRegistry};
pub use store::{KeyValueStore, LocationStore, MemoryStore, RedisStore, ScopedStore, StoreError, StoreKey};
