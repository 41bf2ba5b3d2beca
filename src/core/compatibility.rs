use crate::models::MatchRequest;

/// Score every gate-passing pair starts from.
pub const BASE_SCORE: f64 = 0.5;
/// Bonus when both sides declare the same language.
const LANGUAGE_BONUS: f64 = 0.3;
/// Maximum bonus for interest overlap, scaled by the overlap ratio.
const INTEREST_BONUS_MAX: f64 = 0.2;

/// Mutual gender acceptance between two match requests.
///
/// Symmetric AND of both directional acceptances: `a` accepts `b` iff `a`'s
/// preference is `any` or `b`'s gender is known and equals it, and vice versa.
/// Mode equality is enforced by queue partitioning; callers never evaluate a
/// request against itself.
#[inline]
pub fn gender_compatible(a: &MatchRequest, b: &MatchRequest) -> bool {
    a.preferences.gender_preference.accepts(b.user_gender)
        && b.preferences.gender_preference.accepts(a.user_gender)
}

/// Weighted compatibility score in `[0, 1]`.
///
/// 0.0 when the gender gate fails. Otherwise 0.5 base, +0.3 for a shared
/// language, plus up to 0.2 proportional to interest overlap, capped at 1.0.
/// The score ranks pairs; it does not decide whether they may be paired.
pub fn compatibility_score(a: &MatchRequest, b: &MatchRequest) -> f64 {
    if !gender_compatible(a, b) {
        return 0.0;
    }

    let mut score = BASE_SCORE;

    if let (Some(lang_a), Some(lang_b)) = (&a.preferences.language, &b.preferences.language) {
        if lang_a == lang_b {
            score += LANGUAGE_BONUS;
        }
    }

    score += interest_overlap(&a.preferences.interests, &b.preferences.interests)
        * INTEREST_BONUS_MAX;

    score.min(1.0)
}

/// Overlap ratio `|common| / max(|a|, |b|)`; 0 when either side lists nothing.
#[inline]
fn interest_overlap(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let common = a.iter().filter(|interest| b.contains(interest)).count();
    common as f64 / a.len().max(b.len()) as f64
}
