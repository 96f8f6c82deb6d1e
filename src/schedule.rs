use anyhow::{Result, anyhow};

use crate::model::{Fixture, MatchId, TeamId};

pub fn max_weeks(team_count: usize) -> u32 {
    if team_count < 2 {
        return 0;
    }
    ((team_count - 1) * 2) as u32
}

/// Weeks for which championship predictions are served: the second half of
/// the season.
pub fn prediction_week_bounds(team_count: usize) -> (u32, u32) {
    let max = max_weeks(team_count);
    ((max / 2).max(1), max)
}

/// Double round-robin built with the circle method, ids numbered from
/// `first_id` in (week, slot) order.
///
/// The first team is held fixed and meets the rotating list in order; the rest
/// pair up symmetrically around it. First-half fixtures put the earlier team
/// in `team_ids` at home, the second half mirrors them.
pub fn double_round_robin(team_ids: &[TeamId], first_id: MatchId) -> Result<Vec<Fixture>> {
    let n = team_ids.len();
    if n < 2 {
        return Err(anyhow!("need at least two teams for a schedule, got {n}"));
    }
    if n % 2 != 0 {
        return Err(anyhow!("odd team count {n} is not supported"));
    }
    let mut seen = team_ids.to_vec();
    seen.sort_unstable();
    seen.dedup();
    if seen.len() != n {
        return Err(anyhow!("duplicate team ids in schedule input"));
    }

    let rounds = n - 1;
    let mut first_half: Vec<Vec<(usize, usize)>> = Vec::with_capacity(rounds);
    for r in 0..rounds {
        // Positions 1..n rotate; position 0 stays put.
        let rot = |i: usize| 1 + (i % rounds);
        let mut week = vec![(0, rot(r))];
        for k in 1..n / 2 {
            let a = rot(r + k);
            let b = rot(r + rounds - k);
            week.push((a.min(b), a.max(b)));
        }
        first_half.push(week);
    }

    let mut out = Vec::with_capacity(n * rounds);
    let mut next_id = first_id;
    for (idx, pairs) in first_half.iter().enumerate() {
        for (h, a) in pairs {
            out.push(Fixture::new(next_id, idx as u32 + 1, team_ids[*h], team_ids[*a]));
            next_id += 1;
        }
    }
    for (idx, pairs) in first_half.iter().enumerate() {
        for (h, a) in pairs {
            out.push(Fixture::new(
                next_id,
                (rounds + idx) as u32 + 1,
                team_ids[*a],
                team_ids[*h],
            ));
            next_id += 1;
        }
    }
    Ok(out)
}
