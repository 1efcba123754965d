//! Built-in pipeline stages

pub mod codec;
pub mod conversion;
pub mod core_data;
pub mod filter;
pub mod http;
pub mod mqtt;
pub mod output;

// Re-export stage implementations
pub use codec::*;
pub use conversion::*;
pub use core_data::*;
pub use filter::*;
pub use http::*;
pub use mqtt::*;
pub use output::*;

use crate::registry::StageRegistry;

/// Register all built-in stages with the registry
pub fn register_builtin_stages(registry: &mut StageRegistry) {
    registry.register(FilterByDeviceNameFactory);
    registry.register(FilterByValueDescriptorFactory);
    registry.register(ToJsonFactory);
    registry.register(ToXmlFactory);
    registry.register(CompressFactory::gzip());
    registry.register(CompressFactory::zlib());
    registry.register(EncryptAesFactory);
    registry.register(HttpPostFactory::new());
    registry.register(HttpPostFactory::json());
    registry.register(HttpPostFactory::xml());
    registry.register(MqttSendFactory);
    registry.register(MarkAsPushedFactory);
    registry.register(PushToStorageFactory);
    registry.register(SetOutputDataFactory);
}
