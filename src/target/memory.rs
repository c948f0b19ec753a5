use crate::target::MemoryError;
use std::fs::File;
use std::os::unix::fs::FileExt;
use std::path::PathBuf;

const F32_SIZE: usize = std::mem::size_of::<f32>();

/// Player position read from the game's memory
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GamePosition {
    pub x: f32,
    pub y: f32,
}

/// Raw memory access into another process
pub trait MemoryReader: Send {
    /// Reads `count` native-endian floats starting at `offset`
    ///
    /// Fails instead of returning a partially filled buffer.
    fn read_floats(&self, pid: u32, offset: u64, count: usize) -> Result<Vec<f32>, MemoryError>;

    /// Reads the `(x, y)` float pair at `offset`
    fn read_position(&self, pid: u32, offset: u64) -> Result<GamePosition, MemoryError> {
        match self.read_floats(pid, offset, 2)?.as_slice() {
            &[x, y] => Ok(GamePosition { x, y }),
            other => Err(MemoryError::ShortRead {
                offset,
                expected: 2 * F32_SIZE,
                actual: other.len() * F32_SIZE,
            }),
        }
    }
}

/// Reads `/proc/<pid>/mem`
///
/// Needs ptrace access to the target (same user and a permissive
/// `kernel.yama.ptrace_scope`, or CAP_SYS_PTRACE).
#[derive(Clone, Debug)]
pub struct ProcMemoryReader {
    proc_root: PathBuf,
}

impl Default for ProcMemoryReader {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }
}

impl ProcMemoryReader {
    pub fn with_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    fn mem_path(&self, pid: u32) -> PathBuf {
        self.proc_root.join(pid.to_string()).join("mem")
    }
}

impl MemoryReader for ProcMemoryReader {
    fn read_floats(&self, pid: u32, offset: u64, count: usize) -> Result<Vec<f32>, MemoryError> {
        let path = self.mem_path(pid);
        let file = File::open(&path).map_err(|source| MemoryError::Open { path, source })?;

        let expected = count * F32_SIZE;
        let mut bytes = vec![0u8; expected];
        let mut filled = 0;
        while filled < expected {
            match file.read_at(&mut bytes[filled..], offset + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(source) => return Err(MemoryError::Read { offset, source }),
            }
        }
        if filled < expected {
            return Err(MemoryError::ShortRead {
                offset,
                expected,
                actual: filled,
            });
        }

        Ok(bytes
            .chunks_exact(F32_SIZE)
            .map(|chunk| f32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }
}
