//! Suitability scoring: rank eligible candidates for one incident and pick
//! the single best match.
//!
//! The score is relative to the candidate set being ranked: the distance term
//! normalizes against the pool's maximum distance, so the same responder can
//! score differently against different pools. That is intentional and must be
//! preserved; changing it changes which responder wins borderline dispatches.

use serde::Serialize;

use super::domain::{IncidentPriority, ResponderStatus};
use super::filter::Candidate;

const DISTANCE_WEIGHT: f64 = 40.0;
const EXPERIENCE_WEIGHT: f64 = 25.0;
const CRITICAL_EQUIPMENT_POINTS: f64 = 20.0;
const COMMUNICATION_POINTS: f64 = 10.0;
const AVAILABILITY_POINTS: f64 = 15.0;
const CRITICAL_VETERAN_BONUS: f64 = 10.0;
const CRITICAL_VETERAN_YEARS: u32 = 3;

/// Factors contributing to a suitability score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    Distance,
    Experience,
    Equipment,
    Availability,
    CriticalBonus,
}

/// Discrete contribution to a score, kept for transparent audits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub points: f64,
}

/// A candidate with its computed suitability score and breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
    pub components: Vec<ScoreComponent>,
}

/// Score every candidate in the pool against the incident priority.
pub fn score_candidates(
    candidates: &[Candidate],
    priority: IncidentPriority,
) -> Vec<ScoredCandidate> {
    let max_distance = candidates
        .iter()
        .filter_map(|candidate| candidate.distance_km)
        .fold(0.0_f64, f64::max);
    let max_experience = candidates
        .iter()
        .map(|candidate| candidate.responder.experience_years)
        .max()
        .unwrap_or(0);

    candidates
        .iter()
        .map(|candidate| {
            let mut components = Vec::new();

            // Closer is better. When the whole pool is equidistant (or has
            // no distances at all) the term contributes nothing rather than
            // dividing by zero.
            let distance_points = match candidate.distance_km {
                Some(distance) if max_distance > 0.0 => {
                    (max_distance - distance) / max_distance * DISTANCE_WEIGHT
                }
                _ => 0.0,
            };
            components.push(ScoreComponent {
                factor: ScoreFactor::Distance,
                points: distance_points,
            });

            let experience_points = if max_experience > 0 {
                f64::from(candidate.responder.experience_years) / f64::from(max_experience)
                    * EXPERIENCE_WEIGHT
            } else {
                0.0
            };
            components.push(ScoreComponent {
                factor: ScoreFactor::Experience,
                points: experience_points,
            });

            let mut equipment_points = 0.0;
            if candidate.responder.equipment.critical_response {
                equipment_points += CRITICAL_EQUIPMENT_POINTS;
            }
            if candidate.responder.equipment.communication {
                equipment_points += COMMUNICATION_POINTS;
            }
            components.push(ScoreComponent {
                factor: ScoreFactor::Equipment,
                points: equipment_points,
            });

            // Always true post-filter, but recomputed for robustness.
            let availability_points = if candidate.responder.status == ResponderStatus::Available {
                AVAILABILITY_POINTS
            } else {
                0.0
            };
            components.push(ScoreComponent {
                factor: ScoreFactor::Availability,
                points: availability_points,
            });

            let bonus_points = if priority == IncidentPriority::Critical
                && candidate.responder.experience_years >= CRITICAL_VETERAN_YEARS
            {
                CRITICAL_VETERAN_BONUS
            } else {
                0.0
            };
            components.push(ScoreComponent {
                factor: ScoreFactor::CriticalBonus,
                points: bonus_points,
            });

            let score = components.iter().map(|component| component.points).sum();
            ScoredCandidate {
                candidate: candidate.clone(),
                score,
                components,
            }
        })
        .collect()
}

/// Pick the highest-scoring candidate. Ties break to the lowest responder id
/// so identical pools always produce identical winners.
pub fn select_best(
    candidates: &[Candidate],
    priority: IncidentPriority,
) -> Option<ScoredCandidate> {
    score_candidates(candidates, priority)
        .into_iter()
        .max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    b.candidate
                        .responder
                        .id
                        .cmp(&a.candidate.responder.id)
                })
        })
}
