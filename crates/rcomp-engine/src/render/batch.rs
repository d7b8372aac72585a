//! Greedy coalescing of adjacent copy commands.

use crate::scene::RenderCommand;

/// Contiguous run of compatible copy commands, `commands[start..end]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Batch {
    pub start: usize,
    pub end: usize,
    pub quads: usize,
}

impl Batch {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }

    #[inline]
    pub fn triangles(&self) -> usize {
        self.quads * 2
    }
}

/// Extends a batch from `commands[start]` over following commands with the
/// same kind, texture, blend mode and color while the quad total stays within
/// `max_quads`.
///
/// The first command is always taken, even if it alone exceeds the limit.
/// Returns `None` when `commands[start]` is not a `Copy`/`CopyEx`.
pub fn coalesce(commands: &[RenderCommand], start: usize, max_quads: usize) -> Option<Batch> {
    let first = commands.get(start)?;
    let first_draw = match first {
        RenderCommand::Copy(d) | RenderCommand::CopyEx(d) => d,
        _ => return None,
    };
    let kind = first.kind();

    let mut quads = first_draw.quads();
    let mut end = start + 1;

    for next in &commands[end..] {
        if next.kind() != kind {
            break;
        }
        let Some(draw) = next.draw() else { break };
        if !first_draw.batches_with(draw) || quads + draw.quads() > max_quads {
            break;
        }
        quads += draw.quads();
        end += 1;
    }

    Some(Batch { start, end, quads })
}
