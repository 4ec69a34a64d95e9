use super::{RunState, StepSnapshot};

const BAR_CELLS: u32 = 20;

const UNSORTED: &str = "⬜";
const COMPARING: &str = "🟨";
const SWAPPING: &str = "🟥";
const SORTED: &str = "🟩";

/// Renders a snapshot as Telegram HTML, one bar per value.
pub fn render_board(snapshot: &StepSnapshot<u32>) -> String {
    let max = snapshot.values.iter().copied().max().unwrap_or(0).max(1);
    let swapping = snapshot.pending_swap();

    let bars = snapshot
        .values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let highlighted = matches!(snapshot.comparing, Some((l, r)) if l == index || r == index);
            let marker = if snapshot.sorted.contains(&index) {
                SORTED
            } else if highlighted && swapping {
                SWAPPING
            } else if highlighted {
                COMPARING
            } else {
                UNSORTED
            };
            format!(
                "{} {:>2} {:<width$} {:>3}",
                marker,
                index,
                bar(*value, max),
                value,
                width = BAR_CELLS as usize
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "<b>Visualizer</b>\nWatch how larger elements \"bubble\" to the right.\n\n<pre>{}</pre>\n{}\n\n{}",
        bars,
        status_line(snapshot),
        legend()
    )
}

fn bar(value: u32, max: u32) -> String {
    let cells = (u64::from(value) * u64::from(BAR_CELLS) + u64::from(max) - 1) / u64::from(max);
    "█".repeat(cells as usize)
}

fn status_line(snapshot: &StepSnapshot<u32>) -> String {
    let state = match snapshot.state {
        RunState::Idle => "Ready",
        RunState::Running => "Sorting...",
        RunState::Finished => "Sorted!",
    };
    format!(
        "<i>{}</i> Passes: {} · Comparisons: {} · Swaps: {}",
        state, snapshot.passes, snapshot.comparisons, snapshot.swaps
    )
}

fn legend() -> String {
    format!(
        "{} Unsorted  {} Comparing  {} Swapping  {} Sorted",
        UNSORTED, COMPARING, SWAPPING, SORTED
    )
}
