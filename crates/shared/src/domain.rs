use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownChoice {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! labelled_choice {
    ($name:ident, $kind:literal, { $($variant:ident => $label:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        /// Accepts the wire label (case-insensitive) or a 1-based menu position.
        impl FromStr for $name {
            type Err = UnknownChoice;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                let trimmed = raw.trim();
                if let Ok(position) = trimmed.parse::<usize>() {
                    if let Some(choice) = position
                        .checked_sub(1)
                        .and_then(|index| Self::ALL.get(index))
                    {
                        return Ok(*choice);
                    }
                }
                Self::ALL
                    .iter()
                    .copied()
                    .find(|choice| choice.label().eq_ignore_ascii_case(trimmed))
                    .ok_or_else(|| UnknownChoice {
                        kind: $kind,
                        value: raw.to_string(),
                    })
            }
        }
    };
}

labelled_choice!(GradeLevel, "grade level", {
    Kindergarten => "Kindergarten",
    First => "1st Grade",
    Second => "2nd Grade",
    Third => "3rd Grade",
    Fourth => "4th Grade",
    Fifth => "5th Grade",
    Sixth => "6th Grade",
    Seventh => "7th Grade",
    Eighth => "8th Grade",
    Ninth => "9th Grade",
    Tenth => "10th Grade",
    Eleventh => "11th Grade",
    Twelfth => "12th Grade",
});

labelled_choice!(Subject, "subject", {
    Mathematics => "Mathematics",
    Algebra => "Algebra",
    Geometry => "Geometry",
    Trigonometry => "Trigonometry",
    Calculus => "Calculus",
    Statistics => "Statistics",
    Physics => "Physics",
    Chemistry => "Chemistry",
    Biology => "Biology",
    ComputerScience => "Computer Science",
});

/// Opaque handle returned by the start call when the backend tracks sessions explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSelection {
    pub grade_level: GradeLevel,
    pub subject: Subject,
}

impl QuizSelection {
    pub fn new(grade_level: GradeLevel, subject: Subject) -> Self {
        Self {
            grade_level,
            subject,
        }
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
