//! Bag scanner alerting: one weighted coin flip per alert kind.

use crate::config::{AlertModel, CheckpointConfig, SecurityPolicy};
use crate::entity::{Bag, BagAlerts};
use crate::rng::RandomSource;

/// Decide which alerts a freshly scanned bag raises.
///
/// The suspicious-item alert always flips a coin (false positives are
/// possible). Electronics and liquids only flip when the bag carries them and
/// the policy requires them to be presented separately.
pub fn evaluate<R: RandomSource>(
    bag: &Bag,
    model: &AlertModel,
    policy: &SecurityPolicy,
    rng: &mut R,
) -> BagAlerts {
    let p_suspicious = if bag.has_suspicious_item {
        model.p_alert_given_suspicious_item
    } else {
        model.p_alert_given_no_suspicious_item
    };
    let suspicious_item = rng.chance(CheckpointConfig::fixed_probability(p_suspicious));

    let electronics = policy.electronics_must_be_separate
        && bag.has_electronics
        && rng.chance(CheckpointConfig::fixed_probability(model.p_alert_given_electronics));

    let liquids = policy.liquids_must_be_in_clear_bag
        && bag.has_liquids
        && rng.chance(CheckpointConfig::fixed_probability(model.p_alert_given_liquids));

    BagAlerts {
        suspicious_item,
        electronics,
        liquids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::PassengerId;
    use crate::rng::SimRng;

    fn certain() -> AlertModel {
        AlertModel {
            p_alert_given_suspicious_item: 1.0,
            p_alert_given_no_suspicious_item: 0.0,
            p_alert_given_electronics: 1.0,
            p_alert_given_liquids: 1.0,
        }
    }

    fn bag(configure: impl FnOnce(&mut Bag)) -> Bag {
        let mut bag = Bag::new(&PassengerId::generate(0, 1));
        configure(&mut bag);
        bag
    }

    #[test]
    fn certain_model_flags_exactly_the_contents() {
        let mut rng = SimRng::new(4);
        let b = bag(|b| {
            b.has_suspicious_item = true;
            b.has_liquids = true;
        });
        let alerts = evaluate(&b, &certain(), &SecurityPolicy::default(), &mut rng);
        assert_eq!(
            alerts,
            BagAlerts {
                suspicious_item: true,
                electronics: false,
                liquids: true,
            }
        );
    }

    #[test]
    fn clean_bag_with_no_false_positives_is_quiet() {
        let mut rng = SimRng::new(4);
        let alerts = evaluate(&bag(|_| {}), &certain(), &SecurityPolicy::default(), &mut rng);
        assert!(!alerts.any());
    }

    #[test]
    fn relaxed_policy_suppresses_content_alerts() {
        let mut rng = SimRng::new(4);
        let policy = SecurityPolicy {
            electronics_must_be_separate: false,
            liquids_must_be_in_clear_bag: false,
        };
        let b = bag(|b| {
            b.has_electronics = true;
            b.has_liquids = true;
        });
        let alerts = evaluate(&b, &certain(), &policy, &mut rng);
        assert!(!alerts.electronics);
        assert!(!alerts.liquids);
    }

    #[test]
    fn false_positive_rate_applies_to_clean_bags() {
        let mut rng = SimRng::new(77);
        let model = AlertModel {
            p_alert_given_no_suspicious_item: 0.5,
            ..certain()
        };
        let clean = bag(|_| {});
        let hits = (0..2_000)
            .filter(|_| evaluate(&clean, &model, &SecurityPolicy::default(), &mut rng).suspicious_item)
            .count();
        assert!((800..=1_200).contains(&hits), "expected ~1000, got {hits}");
    }
}
