use fca_engine::{open_engine, BackendKind, BlockEngine, EngineConfig, Result};

/// Opaque context handle that owns one block engine.
pub struct FcaContext {
    pub engine: Box<dyn BlockEngine>,
}

impl FcaContext {
    pub fn open(kind: BackendKind, config: EngineConfig) -> Result<Self> {
        Ok(Self {
            engine: open_engine(kind, config)?,
        })
    }
}
