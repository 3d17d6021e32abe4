use chrono::NaiveTime;
use serde::Deserialize;

use crate::common::Expression;

use super::signals::Conditions;

/// Which rule produced a caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptionKind {
    /// Shown before the first policy tick; never produced by a policy.
    Startup,
    HandRaised,
    Hat,
    Sunglasses,
    Happy,
    Sad,
    Angry,
    Disgusted,
    Surprised,
    Fearful,
    Idle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub kind: CaptionKind,
    pub text: String,
}

impl Caption {
    pub fn new(kind: CaptionKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    pub fn startup(text: impl Into<String>) -> Self {
        Self::new(CaptionKind::Startup, text)
    }
}

/// Caption strings, one per rule of the cascade.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CaptionTexts {
    pub hand_raised: String,
    pub hat: String,
    pub sunglasses: String,
    pub happy: String,
    pub sad: String,
    pub angry: String,
    pub disgusted: String,
    pub surprised: String,
    pub fearful: String,
    /// Followed by a space and the time as `HH:MM`.
    pub idle_prefix: String,
}

impl Default for CaptionTexts {
    fn default() -> Self {
        Self {
            hand_raised: "Hand raised high!".to_string(),
            hat: "Wearing a hat".to_string(),
            sunglasses: "Wearing sunglasses".to_string(),
            happy: "Looking happy".to_string(),
            sad: "Looking a little sad".to_string(),
            angry: "Looking angry".to_string(),
            disgusted: "Looking disgusted".to_string(),
            surprised: "Looking surprised".to_string(),
            fearful: "Looking scared".to_string(),
            idle_prefix: "The camera is watching you at".to_string(),
        }
    }
}

/// Strategy for turning conditions into the caption to show.
pub trait CaptionPolicy: Send + Sync {
    fn select_caption(&self, conditions: &Conditions, now: NaiveTime) -> Caption;
    fn name(&self) -> &'static str;
}

/// Fixed priority cascade; the first matching rule wins.
///
/// Order: hand raised, hat, sunglasses, then the dominant expression (happy, sad, angry,
/// disgusted, surprised, fearful), else the idle caption stamped with the time of day.
/// `multiple_faces` has no rule.
#[derive(Debug, Clone, Default)]
pub struct PriorityCaptionPolicy {
    texts: CaptionTexts,
}

impl PriorityCaptionPolicy {
    pub fn new(texts: CaptionTexts) -> Self {
        Self { texts }
    }

    fn kind_for(conditions: &Conditions) -> CaptionKind {
        if conditions.hand_raised {
            return CaptionKind::HandRaised;
        }
        if conditions.wearing_hat {
            return CaptionKind::Hat;
        }
        if conditions.wearing_sunglasses {
            return CaptionKind::Sunglasses;
        }
        match conditions.dominant_expression {
            Expression::Happy => CaptionKind::Happy,
            Expression::Sad => CaptionKind::Sad,
            Expression::Angry => CaptionKind::Angry,
            Expression::Disgusted => CaptionKind::Disgusted,
            Expression::Surprised => CaptionKind::Surprised,
            Expression::Fearful => CaptionKind::Fearful,
            Expression::Neutral => CaptionKind::Idle,
        }
    }

    fn text_for(&self, kind: CaptionKind, now: NaiveTime) -> String {
        let texts = &self.texts;
        match kind {
            CaptionKind::HandRaised => texts.hand_raised.clone(),
            CaptionKind::Hat => texts.hat.clone(),
            CaptionKind::Sunglasses => texts.sunglasses.clone(),
            CaptionKind::Happy => texts.happy.clone(),
            CaptionKind::Sad => texts.sad.clone(),
            CaptionKind::Angry => texts.angry.clone(),
            CaptionKind::Disgusted => texts.disgusted.clone(),
            CaptionKind::Surprised => texts.surprised.clone(),
            CaptionKind::Fearful => texts.fearful.clone(),
            CaptionKind::Idle | CaptionKind::Startup => {
                format!("{} {}", texts.idle_prefix, now.format("%H:%M"))
            }
        }
    }
}

impl CaptionPolicy for PriorityCaptionPolicy {
    fn select_caption(&self, conditions: &Conditions, now: NaiveTime) -> Caption {
        let kind = Self::kind_for(conditions);
        Caption::new(kind, self.text_for(kind, now))
    }

    fn name(&self) -> &'static str {
        "PriorityCaptionPolicy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nine_oh_five() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 5, 42).unwrap()
    }

    fn select(conditions: Conditions) -> Caption {
        PriorityCaptionPolicy::default().select_caption(&conditions, nine_oh_five())
    }

    #[test]
    fn hand_raised_wins_over_everything() {
        let caption = select(Conditions {
            hand_raised: true,
            wearing_hat: true,
            wearing_sunglasses: true,
            multiple_faces: true,
            dominant_expression: Expression::Happy,
        });
        assert_eq!(caption.kind, CaptionKind::HandRaised);
        assert_eq!(caption.text, CaptionTexts::default().hand_raised);
    }

    #[test]
    fn hat_precedes_sunglasses() {
        let caption = select(Conditions {
            wearing_hat: true,
            wearing_sunglasses: true,
            dominant_expression: Expression::Sad,
            ..Conditions::default()
        });
        assert_eq!(caption.kind, CaptionKind::Hat);
    }

    #[test]
    fn sunglasses_precede_expressions() {
        let caption = select(Conditions {
            wearing_sunglasses: true,
            dominant_expression: Expression::Angry,
            ..Conditions::default()
        });
        assert_eq!(caption.kind, CaptionKind::Sunglasses);
        assert_eq!(caption.text, "Wearing sunglasses");
    }

    #[test]
    fn happy_expression_selects_happy_caption() {
        let caption = select(Conditions {
            dominant_expression: Expression::Happy,
            ..Conditions::default()
        });
        assert_eq!(caption.kind, CaptionKind::Happy);
        assert_eq!(caption.text, "Looking happy");
    }

    #[test]
    fn each_expression_has_its_own_caption() {
        let expected = [
            (Expression::Sad, CaptionKind::Sad),
            (Expression::Angry, CaptionKind::Angry),
            (Expression::Disgusted, CaptionKind::Disgusted),
            (Expression::Surprised, CaptionKind::Surprised),
            (Expression::Fearful, CaptionKind::Fearful),
        ];
        for (expression, kind) in expected {
            let caption = select(Conditions {
                dominant_expression: expression,
                ..Conditions::default()
            });
            assert_eq!(caption.kind, kind, "{}", expression.as_str());
        }
    }

    #[test]
    fn neutral_falls_back_to_the_time_stamped_caption() {
        let caption = select(Conditions::default());
        assert_eq!(caption.kind, CaptionKind::Idle);
        assert!(caption.text.ends_with("09:05"), "{}", caption.text);
        assert_eq!(caption.text, "The camera is watching you at 09:05");
    }

    #[test]
    fn multiple_faces_alone_does_not_change_the_caption() {
        let caption = select(Conditions {
            multiple_faces: true,
            ..Conditions::default()
        });
        assert_eq!(caption.kind, CaptionKind::Idle);
    }

    #[test]
    fn every_condition_combination_maps_to_a_policy_caption() {
        let texts = CaptionTexts::default();
        let fixed = [
            &texts.hand_raised,
            &texts.hat,
            &texts.sunglasses,
            &texts.happy,
            &texts.sad,
            &texts.angry,
            &texts.disgusted,
            &texts.surprised,
            &texts.fearful,
        ];
        for bits in 0..16u8 {
            for expression in Expression::ALL {
                let caption = select(Conditions {
                    hand_raised: bits & 1 != 0,
                    wearing_hat: bits & 2 != 0,
                    wearing_sunglasses: bits & 4 != 0,
                    multiple_faces: bits & 8 != 0,
                    dominant_expression: expression,
                });
                assert_ne!(caption.kind, CaptionKind::Startup);
                let known = fixed.iter().any(|t| **t == caption.text)
                    || caption.text == "The camera is watching you at 09:05";
                assert!(known, "unexpected caption {:?}", caption);
            }
        }
    }

    #[test]
    fn configured_texts_are_used() {
        let policy = PriorityCaptionPolicy::new(CaptionTexts {
            hat: "Nice hat".to_string(),
            idle_prefix: "Hello".to_string(),
            ..CaptionTexts::default()
        });
        let hat = policy.select_caption(
            &Conditions {
                wearing_hat: true,
                ..Conditions::default()
            },
            nine_oh_five(),
        );
        assert_eq!(hat.text, "Nice hat");
        let idle = policy.select_caption(&Conditions::default(), nine_oh_five());
        assert_eq!(idle.text, "Hello 09:05");
    }
}
