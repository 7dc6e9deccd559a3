//! Prompt composition.
//!
//! Every prompt sent to the provider ends with [`STYLE_SUFFIX`] so all
//! assets share the same pixel-art register whatever the subject.

pub const STYLE_SUFFIX: &str = "16-bit retro style, vibrant colors, pixel art sprite for a video game. The object must be on a transparent background. --style pixelart --ar 1:1";

/// Build the full prompt text from its parts.
///
/// Optional parts that are `None` or empty are left out.
pub fn compose(base: &str, negative: Option<&str>, style_lock: Option<&str>) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(4);

    if let Some(reference) = style_lock.filter(|s| !s.is_empty()) {
        parts.push(format!("In the same artistic style as a \"{}\".", reference));
    }

    parts.push(base.to_string());

    if let Some(avoid) = negative.filter(|s| !s.is_empty()) {
        parts.push(format!("AVOID the following elements: {}.", avoid));
    }

    parts.push(STYLE_SUFFIX.to_string());

    parts.join(" ")
}

/// Starter subjects offered when the user has no prompt of their own.
pub const PROMPT_IDEAS: [&str; 16] = [
    "a glowing magic sword",
    "a chest full of gold",
    "a cute slime monster",
    "an ancient spellbook",
    "a steampunk robot",
    "a healing potion",
    "a mysterious floating crystal",
    "a rustic wooden shield",
    "a goblin thief",
    "a dragon's egg",
    "a sci-fi laser pistol",
    "a treasure map",
    "a hero walking",
    "a coin spinning",
    "an explosion effect",
    "a flag waving",
];

/// A random entry of [`PROMPT_IDEAS`].
pub fn inspire() -> &'static str {
    let pick = uuid::Uuid::new_v4().as_u128() % PROMPT_IDEAS.len() as u128;
    PROMPT_IDEAS[pick as usize]
}

/// Subject line for a static batch.
pub fn static_subject(prompt: &str) -> String {
    format!("A single, centered object of a {}", prompt)
}

/// Subject line for an animation of `frames` frames.
pub fn animation_subject(prompt: &str, frames: u32) -> String {
    format!("{}-frame animation sprite sheet for a \"{}\" action", frames, prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_prompt() {
        let prompt = compose("a glowing magic sword", None, None);
        assert_eq!(prompt, format!("a glowing magic sword {}", STYLE_SUFFIX));
    }

    #[test]
    fn test_all_parts_in_order() {
        let prompt = compose("a goblin thief", Some("text, watermark"), Some("a steampunk robot"));

        assert_eq!(
            prompt,
            format!(
                "In the same artistic style as a \"a steampunk robot\". a goblin thief AVOID the following elements: text, watermark. {}",
                STYLE_SUFFIX
            )
        );
    }

    #[test]
    fn test_suffix_and_base_always_present() {
        let bases = ["a chest full of gold", "", "an \"ancient\" spellbook", "a\nmultiline"];
        let negatives = [None, Some(""), Some("blur")];
        let locks = [None, Some(""), Some("a dragon's egg")];

        for base in bases {
            for negative in negatives {
                for lock in locks {
                    let prompt = compose(base, negative, lock);
                    assert!(prompt.ends_with(STYLE_SUFFIX));
                    assert!(prompt.contains(base));
                    if let Some(lock) = lock.filter(|l| !l.is_empty()) {
                        assert!(prompt.contains(&format!("\"{}\"", lock)));
                    } else {
                        assert!(!prompt.contains("artistic style"));
                    }
                    if negative.map_or(true, str::is_empty) {
                        assert!(!prompt.contains("AVOID"));
                    }
                }
            }
        }
    }

    #[test]
    fn test_subject_framing() {
        assert_eq!(
            static_subject("cute slime monster"),
            "A single, centered object of a cute slime monster"
        );
        assert_eq!(
            animation_subject("a hero walking", 8),
            "8-frame animation sprite sheet for a \"a hero walking\" action"
        );
    }

    #[test]
    fn test_inspire_picks_a_known_idea() {
        for _ in 0..50 {
            assert!(PROMPT_IDEAS.contains(&inspire()));
        }
        assert!(PROMPT_IDEAS.iter().all(|idea| !idea.trim().is_empty()));
    }
}
