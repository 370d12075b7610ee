use beatforge_domain_chart::{ChartSnapshot, Note};
use beatforge_domain_paste::{paste, Clipboard, PasteDestination, PastePolicy};
use beatforge_ports::types::{Beat, Lane};

#[derive(Clone, Copy, Debug)]
pub struct PasteRequest {
    pub offset: Beat,
    pub lane: Option<Lane>,
    pub policy: PastePolicy,
}

/// Remaps the clipboard into `dest` and returns the notes that would be inserted.
pub fn remap(
    dest: &ChartSnapshot,
    clipboard: &Clipboard,
    request: PasteRequest,
) -> anyhow::Result<Vec<Note>> {
    dest.validate()?;
    anyhow::ensure!(
        request.offset.is_finite() && request.offset >= 0.0,
        "paste offset must be a non-negative beat, got {}",
        request.offset
    );

    let target = PasteDestination {
        tempo: &dest.tempo,
        offset: request.offset,
        lane: request.lane,
        total_beats: dest.total_beats(),
        lane_count: dest.lane_count,
    };
    let notes: Vec<Note> = paste(clipboard, target, request.policy).collect();
    tracing::debug!(
        copied = clipboard.notes().len(),
        placed = notes.len(),
        policy = ?request.policy,
        "paste remapped"
    );
    Ok(notes)
}

/// `dest` with the pasted notes merged in; notes already present are kept once.
pub fn merge(
    mut dest: ChartSnapshot,
    clipboard: &Clipboard,
    request: PasteRequest,
) -> anyhow::Result<ChartSnapshot> {
    let notes = remap(&dest, clipboard, request)?;
    dest.notes.extend(notes);
    Ok(dest)
}
