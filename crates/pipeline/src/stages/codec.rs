//! Compression and encryption stages.

use std::sync::Arc;

use event_types::Addressable;

use crate::collab::{CompressionAlgorithm, Compressor, Encryptor, StageInitCtx};
use crate::data::Payload;
use crate::error::StageError;
use crate::params::{keys, ParamKind, ParamSpec, ResolvedParams};
use crate::registry::StageFactory;
use crate::stage::{Stage, StageContext};

pub const COMPRESS_GZIP: &str = "compress-gzip";
pub const COMPRESS_ZLIB: &str = "compress-zlib";
pub const ENCRYPT_AES: &str = "encrypt-aes";

fn compress_stage_type(algorithm: CompressionAlgorithm) -> &'static str {
    match algorithm {
        CompressionAlgorithm::Gzip => COMPRESS_GZIP,
        CompressionAlgorithm::Zlib => COMPRESS_ZLIB,
    }
}

/// Compresses the incoming data with a fixed algorithm.
pub struct Compress {
    algorithm: CompressionAlgorithm,
    compressor: Arc<dyn Compressor>,
}

impl Compress {
    pub fn algorithm(&self) -> CompressionAlgorithm {
        self.algorithm
    }
}

impl Stage for Compress {
    fn id(&self) -> &str {
        compress_stage_type(self.algorithm)
    }

    fn process(
        &mut self,
        data: Payload,
        _ctx: &mut StageContext,
    ) -> Result<Option<Payload>, StageError> {
        let bytes = data.into_bytes()?;
        let compressed = self
            .compressor
            .compress(self.algorithm, &bytes)
            .map_err(|e| StageError::collaborator(compress_stage_type(self.algorithm), e))?;
        Ok(Some(Payload::Bytes(compressed)))
    }
}

/// One factory per algorithm; register both.
pub struct CompressFactory {
    algorithm: CompressionAlgorithm,
}

impl CompressFactory {
    pub fn gzip() -> Self {
        Self {
            algorithm: CompressionAlgorithm::Gzip,
        }
    }

    pub fn zlib() -> Self {
        Self {
            algorithm: CompressionAlgorithm::Zlib,
        }
    }
}

impl StageFactory for CompressFactory {
    fn stage_type(&self) -> &'static str {
        compress_stage_type(self.algorithm)
    }

    fn create(
        &self,
        _: &ResolvedParams,
        _: Option<&Addressable>,
        init: &StageInitCtx,
    ) -> Result<Box<dyn Stage>, StageError> {
        Ok(Box::new(Compress {
            algorithm: self.algorithm,
            compressor: init.compressor(self.stage_type())?,
        }))
    }
}

/// AES-encrypts the incoming data with a key and initialization vector
/// fixed at construction.
pub struct EncryptAes {
    key: String,
    init_vector: String,
    encryptor: Arc<dyn Encryptor>,
}

impl Stage for EncryptAes {
    fn id(&self) -> &str {
        ENCRYPT_AES
    }

    fn process(
        &mut self,
        data: Payload,
        _ctx: &mut StageContext,
    ) -> Result<Option<Payload>, StageError> {
        let bytes = data.into_bytes()?;
        let encrypted = self
            .encryptor
            .encrypt_aes(&self.key, &self.init_vector, &bytes)
            .map_err(|e| StageError::collaborator(ENCRYPT_AES, e))?;
        Ok(Some(Payload::Bytes(encrypted)))
    }
}

#[derive(Default)]
pub struct EncryptAesFactory;

impl StageFactory for EncryptAesFactory {
    fn stage_type(&self) -> &'static str {
        ENCRYPT_AES
    }

    fn params(&self) -> &'static [ParamSpec] {
        const PARAMS: &[ParamSpec] = &[
            ParamSpec::required(keys::KEY, ParamKind::Raw),
            ParamSpec::required(keys::INIT_VECTOR, ParamKind::Raw),
        ];
        PARAMS
    }

    fn create(
        &self,
        params: &ResolvedParams,
        _: Option<&Addressable>,
        init: &StageInitCtx,
    ) -> Result<Box<dyn Stage>, StageError> {
        // Key material is never logged.
        Ok(Box::new(EncryptAes {
            key: params.text(keys::KEY)?.to_string(),
            init_vector: params.text(keys::INIT_VECTOR)?.to_string(),
            encryptor: init.encryptor(ENCRYPT_AES)?,
        }))
    }
}
