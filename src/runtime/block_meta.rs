/// Block metadata
///
/// The instance name doubles as the source id of emitted stream tags.
#[derive(Debug, Clone)]
pub struct BlockMeta {
    type_name: String,
    instance_name: Option<String>,
}

impl BlockMeta {
    /// Create metadata for a block type
    pub fn new(type_name: &str) -> BlockMeta {
        BlockMeta {
            type_name: type_name.to_string(),
            instance_name: None,
        }
    }

    /// Type name of the block
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Instance name, if set
    pub fn instance_name(&self) -> Option<&str> {
        self.instance_name.as_deref()
    }

    /// Set the instance name
    pub fn set_instance_name(&mut self, name: &str) {
        self.instance_name = Some(name.to_string());
    }

    /// Name used as source id of stream tags.
    ///
    /// Falls back to the type name.
    pub fn source_id(&self) -> String {
        self.instance_name
            .clone()
            .unwrap_or_else(|| self.type_name.clone())
    }
}
