use ipcseal_frame::FrameConfig;

/// Shared memory size used when the caller does not pick one.
pub const DEFAULT_SHM_SIZE: usize = 1024;

/// Registry-wide settings.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Framing limits applied to both ends of every pipe channel.
    pub pipe_frame: FrameConfig,
    /// Block size for [`create_shared_memory_default`](crate::ChannelRegistry::create_shared_memory_default).
    pub default_shm_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            pipe_frame: FrameConfig::default(),
            default_shm_size: DEFAULT_SHM_SIZE,
        }
    }
}
