use serde::Serialize;

/// Counters of a single merge run. Field names follow the flat record consumers expect.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    #[serde(rename = "total_roads_file1")]
    pub total_left: usize,
    #[serde(rename = "total_roads_file2")]
    pub total_right: usize,
    #[serde(rename = "matched_roads")]
    pub matched: usize,
    #[serde(rename = "unmatched_roads_file1")]
    pub unmatched_left: usize,
    #[serde(rename = "unmatched_roads_file2")]
    pub unmatched_right: usize,
}

impl MergeStats {
    pub fn new(total_left: usize, total_right: usize) -> Self {
        Self {
            total_left,
            total_right,
            ..Self::default()
        }
    }

    /// Matched roads as a percentage of the larger input. Zero when both inputs are empty.
    pub fn match_rate(&self) -> f64 {
        let total = self.total_left.max(self.total_right);
        if 0 == total {
            return 0.0;
        }
        self.matched as f64 / total as f64 * 100.0
    }

    pub fn log_report(&self) {
        log::info!("Merging statistics:");
        log::info!("Total roads in file 1: {}", self.total_left);
        log::info!("Total roads in file 2: {}", self.total_right);
        log::info!("Successfully matched roads: {}", self.matched);
        log::info!("Unmatched roads from file 1: {}", self.unmatched_left);
        log::info!("Unmatched roads from file 2: {}", self.unmatched_right);
        log::info!("Match rate: {:.2}%", self.match_rate());
    }
}

/// Stats record as written next to the merged output.
#[derive(Serialize, Debug)]
pub struct StatsRecord {
    #[serde(flatten)]
    pub stats: MergeStats,
    pub match_rate: f64,
}

impl From<MergeStats> for StatsRecord {
    fn from(stats: MergeStats) -> Self {
        Self {
            match_rate: stats.match_rate(),
            stats,
        }
    }
}
