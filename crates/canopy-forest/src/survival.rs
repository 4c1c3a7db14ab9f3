//! Survival helpers: event-time index, Nelson–Aalen estimator, log-rank
//! scores and Harrell's concordance index.

/// Per-row positions of survival times relative to the sorted unique event times.
#[derive(Debug, Clone)]
pub(crate) struct SurvivalIndex {
    event_times: Vec<f64>,
    /// Number of event times `<= time[row]`; the row is at risk at event
    /// time `k` iff `k < risk_end[row]`.
    risk_end: Vec<usize>,
    /// Index of the row's own time among the event times, for event rows.
    death_slot: Vec<Option<usize>>,
}

impl SurvivalIndex {
    pub(crate) fn build(time: &[f64], event: &[bool]) -> Self {
        let event_times = unique_event_times(time, event);
        let risk_end = time
            .iter()
            .map(|&t| event_times.partition_point(|&e| e <= t))
            .collect();
        let death_slot = time
            .iter()
            .zip(event)
            .map(|(&t, &e)| {
                if e {
                    event_times.binary_search_by(|probe| probe.total_cmp(&t)).ok()
                } else {
                    None
                }
            })
            .collect();
        Self {
            event_times,
            risk_end,
            death_slot,
        }
    }

    pub(crate) fn event_times(&self) -> &[f64] {
        &self.event_times
    }

    pub(crate) fn n_times(&self) -> usize {
        self.event_times.len()
    }

    #[inline]
    pub(crate) fn risk_end(&self, row: usize) -> usize {
        self.risk_end[row]
    }

    #[inline]
    pub(crate) fn death_slot(&self, row: usize) -> Option<usize> {
        self.death_slot[row]
    }

    /// Event and at-risk counts per event time for a set of rows.
    pub(crate) fn counts(&self, rows: &[usize]) -> RiskCounts {
        let mut counts = RiskCounts::zeros(self.n_times());
        for &row in rows {
            counts.add(self, row);
        }
        counts
    }

    /// Nelson–Aalen cumulative hazard of `rows`, aligned with the event times.
    pub(crate) fn cumulative_hazard(&self, rows: &[usize]) -> Vec<f64> {
        let counts = self.counts(rows);
        let at_risk = counts.at_risk();
        let mut chf = Vec::with_capacity(self.n_times());
        let mut cumulative = 0.0;
        for (k, &y) in at_risk.iter().enumerate() {
            if y > 0.0 {
                cumulative += counts.deaths[k] / y;
            }
            chf.push(cumulative);
        }
        chf
    }
}

/// Event counts and at-risk bookkeeping over the event times.
///
/// At-risk numbers are stored as "leaves the risk set after slot k" counts so
/// adding a row is O(1); [`RiskCounts::at_risk`] turns them into suffix sums.
#[derive(Debug, Clone)]
pub(crate) struct RiskCounts {
    pub(crate) deaths: Vec<f64>,
    exits: Vec<f64>,
    pub(crate) n: f64,
}

impl RiskCounts {
    pub(crate) fn zeros(n_times: usize) -> Self {
        Self {
            deaths: vec![0.0; n_times],
            exits: vec![0.0; n_times + 1],
            n: 0.0,
        }
    }

    #[inline]
    pub(crate) fn add(&mut self, index: &SurvivalIndex, row: usize) {
        if let Some(slot) = index.death_slot(row) {
            self.deaths[slot] += 1.0;
        }
        self.exits[index.risk_end(row)] += 1.0;
        self.n += 1.0;
    }

    /// Number of rows at risk at each event time.
    pub(crate) fn at_risk(&self) -> Vec<f64> {
        let n_times = self.deaths.len();
        let mut at_risk = vec![0.0; n_times];
        let mut running = self.exits[n_times];
        for k in (0..n_times).rev() {
            // Rows with risk_end > k are at risk at slot k.
            at_risk[k] = running;
            running += self.exits[k];
        }
        at_risk
    }
}

/// Sorted unique times of rows with an event.
pub(crate) fn unique_event_times(time: &[f64], event: &[bool]) -> Vec<f64> {
    let mut times: Vec<f64> = time
        .iter()
        .zip(event)
        .filter(|&(_, &e)| e)
        .map(|(&t, _)| t)
        .collect();
    times.sort_unstable_by(|a, b| a.total_cmp(b));
    times.dedup();
    times
}

/// Log-rank scores of `rows`: event indicator minus the Nelson–Aalen hazard at the row's time.
///
/// Returned in the order of `rows`.
pub(crate) fn logrank_scores(rows: &[usize], time: &[f64], event: &[bool]) -> Vec<f64> {
    let n = rows.len();
    let mut order: Vec<usize> = (0..n).collect();
    // Events sort before censored rows at tied times.
    order.sort_by(|&a, &b| {
        time[rows[a]]
            .total_cmp(&time[rows[b]])
            .then(event[rows[b]].cmp(&event[rows[a]]))
    });
    let mut scores = vec![0.0; n];
    let mut hazard = 0.0;
    for (rank, &pos) in order.iter().enumerate() {
        let row = rows[pos];
        if event[row] {
            hazard += 1.0 / (n - rank) as f64;
        }
        scores[pos] = f64::from(u8::from(event[row])) - hazard;
    }
    scores
}

/// Harrell's concordance index of `risk` against survival outcomes.
///
/// A pair `(i, j)` is comparable when `time[i] < time[j]` and `i` had an
/// event; it is concordant when `risk[i] > risk[j]`, and ties in risk count
/// one half. Returns `None` when no pair is comparable.
pub(crate) fn concordance_index(risk: &[f64], time: &[f64], event: &[bool]) -> Option<f64> {
    let n = risk.len();
    let mut comparable = 0.0;
    let mut concordant = 0.0;
    for i in 0..n {
        if !event[i] {
            continue;
        }
        for j in 0..n {
            if time[i] < time[j] {
                comparable += 1.0;
                if risk[i] > risk[j] {
                    concordant += 1.0;
                } else if risk[i] == risk[j] {
                    concordant += 0.5;
                }
            }
        }
    }
    if comparable > 0.0 {
        Some(concordant / comparable)
    } else {
        None
    }
}
