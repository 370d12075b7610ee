use beatforge_domain_chart::ChartSnapshot;
use beatforge_ports::types::{Beat, Millis};
use serde::Serialize;

#[derive(Clone, Copy, Debug)]
pub enum Position {
    Beat(Beat),
    Millis(Millis),
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Conversion {
    pub beat: Beat,
    pub ms: Millis,
    pub bpm: f64,
}

/// Places `position` on both axes of the chart's tempo map.
pub fn convert(chart: &ChartSnapshot, position: Position) -> anyhow::Result<Conversion> {
    chart.validate()?;
    let map = chart.tempo_map();
    let (beat, ms) = match position {
        Position::Beat(beat) => (beat, map.beat_to_time(beat)),
        Position::Millis(ms) => (map.time_to_beat(ms), ms),
    };
    anyhow::ensure!(
        beat.is_finite() && ms.is_finite(),
        "position must be a finite number"
    );
    Ok(Conversion {
        beat,
        ms,
        bpm: map.bpm_at(beat),
    })
}
