use crate::core::config::Instrument;
use crate::core::signal::ScoreTable;
use chrono::NaiveDate;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedInstrument {
    pub code: String,
    pub name: String,
    pub score: f64,
}

impl RankedInstrument {
    pub fn label(&self) -> String {
        format!("{}({})", self.name, self.code)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub as_of: NaiveDate,
    /// Every scored instrument, best first.
    pub ranking: Vec<RankedInstrument>,
}

impl Recommendation {
    pub fn top(&self) -> &RankedInstrument {
        &self.ranking[0]
    }

    /// Plain-text rendering used for push notifications.
    pub fn message(&self) -> String {
        let mut out = format!("Signals as of {} (higher is better)\n\n", self.as_of);
        for (rank, entry) in self.ranking.iter().enumerate() {
            let _ = writeln!(out, "{}. {}: {:.4}", rank + 1, entry.label(), entry.score);
        }
        let _ = write!(out, "\nRecommended: {}", self.top().label());
        out
    }
}

/// Picks the best instrument from the latest row of `table`.
///
/// Ties go to the lowest instrument code: rows iterate in code order and the
/// ranking sort is stable, so tied entries keep that order.
pub fn recommend(table: &ScoreTable, instruments: &[Instrument]) -> Option<Recommendation> {
    let row = table.latest()?;

    let mut ranking: Vec<RankedInstrument> = row
        .scores
        .iter()
        .map(|(code, score)| RankedInstrument {
            code: code.clone(),
            name: instruments
                .iter()
                .find(|i| &i.code == code)
                .map_or_else(|| code.clone(), |i| i.name.clone()),
            score: *score,
        })
        .collect();
    if ranking.is_empty() {
        return None;
    }
    ranking.sort_by(|a, b| b.score.total_cmp(&a.score));

    Some(Recommendation {
        as_of: row.date,
        ranking,
    })
}
