//! Stage-by-stage pipeline summary.

use crate::model::deal::Stage;
use crate::repo::{RepoError, RepoResult};
use crate::report::round_money;
use log::debug;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StageMetrics {
    pub count: u64,
    pub total_value: f64,
    pub weighted_value: f64,
}

/// Pipeline summary. `stages` always holds all six stages in pipeline order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DealPipeline {
    pub stages: BTreeMap<Stage, StageMetrics>,
    /// Sum of `total_value` over open stages.
    pub pipeline_value: f64,
    /// Sum of `weighted_value` over open stages.
    pub pipeline_weighted: f64,
}

impl DealPipeline {
    pub fn stage(&self, stage: Stage) -> StageMetrics {
        self.stages.get(&stage).copied().unwrap_or_default()
    }
}

/// Aggregates every stored deal by stage.
pub fn deal_pipeline(conn: &Connection) -> RepoResult<DealPipeline> {
    let started_at = Instant::now();
    let mut stages: BTreeMap<Stage, StageMetrics> = Stage::ALL
        .into_iter()
        .map(|stage| (stage, StageMetrics::default()))
        .collect();

    let mut stmt = conn.prepare(
        "SELECT
            stage,
            COUNT(*) AS deal_count,
            COALESCE(SUM(value), 0) AS total_value,
            COALESCE(SUM(value * probability), 0) AS weighted_value
         FROM deals
         GROUP BY stage;",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let stage_text: String = row.get("stage")?;
        let stage = stage_text.parse::<Stage>().map_err(|_| {
            RepoError::InvalidData(format!("invalid stage `{stage_text}` in deals.stage"))
        })?;
        let count: i64 = row.get("deal_count")?;
        stages.insert(
            stage,
            StageMetrics {
                count: u64::try_from(count).unwrap_or_default(),
                total_value: round_money(row.get("total_value")?),
                weighted_value: round_money(row.get("weighted_value")?),
            },
        );
    }

    let open = stages.iter().filter(|(stage, _)| stage.is_open());
    let (pipeline_value, pipeline_weighted) = open.fold((0.0, 0.0), |(value, weighted), (_, m)| {
        (value + m.total_value, weighted + m.weighted_value)
    });

    debug!(
        "event=report_pipeline module=report status=ok duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(DealPipeline {
        stages,
        pipeline_value: round_money(pipeline_value),
        pipeline_weighted: round_money(pipeline_weighted),
    })
}
