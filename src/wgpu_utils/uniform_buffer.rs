// src/wgpu_utils/uniform_buffer.rs
//! Per-frame uniform storage

/// Offset alignment every constant block starts on. 256 is the largest
/// `min_uniform_buffer_offset_alignment` any wgpu backend reports.
pub const UNIFORM_ALIGNMENT: u64 = 256;

const MIN_CAPACITY: u64 = 64 * 1024;

/// One growable uniform buffer holding every constant block of a frame
///
/// The frame's blocks are packed on the CPU first, then written with a single
/// `write_buffer`; bind groups address each block by offset.
pub struct UniformArena {
    buffer: wgpu::Buffer,
    previous_content: Vec<u8>,
}

impl UniformArena {
    fn create_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("UniformArena"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            buffer: Self::create_buffer(device, MIN_CAPACITY),
            previous_content: Vec::new(),
        }
    }

    /// Replaces the arena contents, growing the buffer if needed.
    ///
    /// Returns true when the buffer was reallocated, which invalidates any
    /// bind group built against the old one.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, content: &[u8]) -> bool {
        let needed = required_capacity(content.len() as u64);
        let grown = needed > self.buffer.size();
        if grown {
            log::debug!("uniform arena grows to {} bytes", needed);
            self.buffer = Self::create_buffer(device, needed);
            self.previous_content.clear();
        }
        if !content.is_empty() && self.previous_content != content {
            queue.write_buffer(&self.buffer, 0, content);
            self.previous_content = content.to_vec();
        }
        grown
    }

    /// Binding for `size` bytes starting at `offset`
    pub fn binding_resource(&self, offset: u64, size: u64) -> wgpu::BindingResource {
        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
            buffer: &self.buffer,
            offset,
            size: wgpu::BufferSize::new(size),
        })
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn size(&self) -> u64 {
        self.buffer.size()
    }
}

/// Smallest power-of-two capacity (at least 64 KiB) holding `len` bytes
pub fn required_capacity(len: u64) -> u64 {
    len.max(MIN_CAPACITY).next_power_of_two()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_grows_in_powers_of_two() {
        assert_eq!(required_capacity(0), MIN_CAPACITY);
        assert_eq!(required_capacity(MIN_CAPACITY), MIN_CAPACITY);
        assert_eq!(required_capacity(MIN_CAPACITY + 1), MIN_CAPACITY * 2);
        assert_eq!(required_capacity(300_000), 512 * 1024);
    }
}
