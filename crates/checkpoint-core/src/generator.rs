//! Randomized passengers for spawn control.

use crate::config::{CheckpointConfig, PassengerProfile};
use crate::entity::{MAX_FAMILIARITY, Passenger, PresentingGender, Sex};
use crate::fixed::{Fixed64, SimMillis};
use crate::id::PassengerId;
use crate::rng::RandomSource;

/// Upper bound (exclusive) of the random part of a passenger ID.
pub const ID_SUFFIX_RANGE: u64 = 1_000_000_000;

fn coin<R: RandomSource>(rng: &mut R, p: f64) -> bool {
    rng.chance(CheckpointConfig::fixed_probability(p))
}

fn draw_sex<R: RandomSource>(rng: &mut R) -> Sex {
    if rng.chance(Fixed64::from_num(0.5)) {
        Sex::Male
    } else {
        Sex::Female
    }
}

/// Build a passenger spawned at `now`, with a bag decided by the profile.
pub fn generate_passenger<R: RandomSource>(
    now: SimMillis,
    profile: &PassengerProfile,
    rng: &mut R,
) -> Passenger {
    let id = PassengerId::generate(now, rng.below(ID_SUFFIX_RANGE));
    let mut passenger = Passenger::new(id);

    passenger.sex = draw_sex(rng);
    passenger.presenting_gender = if coin(rng, profile.ambiguous_presentation_probability) {
        PresentingGender::Ambiguous
    } else {
        match passenger.sex {
            Sex::Male => PresentingGender::Male,
            Sex::Female => PresentingGender::Female,
        }
    };
    let nationality = rng.below(profile.nationalities.len() as u64) as usize;
    passenger.nationality = profile.nationalities.get(nationality).cloned().unwrap_or_default();
    passenger.security_familiarity = rng.below(u64::from(MAX_FAMILIARITY) + 1) as u8;
    passenger.preferred_security_agent_gender =
        coin(rng, profile.agent_preference_probability).then(|| draw_sex(rng));
    passenger.journey.spawned = Some(now);

    if coin(rng, profile.bag_probability) {
        let electronics = coin(rng, profile.electronics_probability);
        let suspicious = coin(rng, profile.suspicious_item_probability);
        let liquids = coin(rng, profile.liquids_probability);
        passenger = passenger.with_bag(|bag| {
            bag.has_electronics = electronics;
            bag.has_suspicious_item = suspicious;
            bag.has_liquids = liquids;
        });
    }
    passenger
}
