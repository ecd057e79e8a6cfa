//! Built-in study catalog for the local backend.
//!
//! Three subjects with a small bank of concepts and per-difficulty
//! questions. Chemistry is intentionally empty; it exercises the
//! no-cards path end to end.

use quizflow_core::model::{AnswerOption, Concept, Difficulty, Question, Subject};

/// A catalog question together with its answer key.
#[derive(Debug, Clone)]
pub struct CatalogQuestion {
    pub question: Question,
    pub correct_option_id: String,
    pub explanation: String,
}

pub fn subjects() -> Vec<Subject> {
    vec![
        subject("physics", "Physics", "Explore fundamental laws of nature and energy"),
        subject(
            "mathematics",
            "Mathematics",
            "Master equations, calculus, and number theory",
        ),
        subject(
            "chemistry",
            "Chemistry",
            "Understand molecular structures and reactions",
        ),
    ]
}

pub fn concepts(subject_id: &str) -> Vec<Concept> {
    match subject_id {
        "physics" => vec![
            concept(
                "energy-mass",
                "Mass-Energy Equivalence",
                "E = mc^2",
                "Energy and mass are interchangeable; energy equals mass times the speed of light squared.",
            ),
            concept(
                "newton-second",
                "Newton's Second Law",
                "F = ma",
                "Force equals mass times acceleration, describing how objects move under force.",
            ),
            concept(
                "kinetic-energy",
                "Kinetic Energy",
                r"KE = \frac{1}{2}mv^2",
                "The energy of motion depends on mass and velocity squared.",
            ),
        ],
        "mathematics" => vec![
            concept(
                "pythagorean",
                "Pythagorean Theorem",
                "a^2 + b^2 = c^2",
                "In right triangles, the square of the hypotenuse equals the sum of squares of other sides.",
            ),
            concept(
                "quadratic-formula",
                "Quadratic Formula",
                r"x = \frac{-b \pm \sqrt{b^2-4ac}}{2a}",
                "Solves any quadratic equation of form ax² + bx + c = 0.",
            ),
            concept(
                "derivative-power",
                "Power Rule Derivative",
                r"\frac{d}{dx}x^n = nx^{n-1}",
                "Derivative of x to the power n equals n times x to the power n-1.",
            ),
        ],
        _ => Vec::new(),
    }
}

/// Look up the question bank entry for a concept at a difficulty.
pub fn question(concept_id: &str, difficulty: Difficulty) -> Option<CatalogQuestion> {
    all_questions()
        .into_iter()
        .find(|q| q.question.concept_id == concept_id && q.question.difficulty == difficulty)
}

/// Look up a question bank entry by question id, for grading.
pub fn question_by_id(question_id: &str) -> Option<CatalogQuestion> {
    all_questions()
        .into_iter()
        .find(|q| q.question.id == question_id)
}

fn all_questions() -> Vec<CatalogQuestion> {
    vec![
        entry(
            "q-em-easy",
            "energy-mass",
            r#"In E = mc^2, what does "c" represent?"#,
            Difficulty::Easy,
            [
                "The speed of light",
                "A constant of proportionality",
                "The speed of sound",
                "Coulomb force",
            ],
            "In mass-energy equivalence, c is the speed of light in a vacuum.",
        ),
        entry(
            "q-em-med",
            "energy-mass",
            r"If mass is 2 kg and c = 3 \times 10^8 m/s, what is the energy (in Joules)?",
            Difficulty::Medium,
            ["1.8 × 10¹⁷ J", "6 × 10⁸ J", "9 × 10¹⁶ J", "1.8 × 10⁸ J"],
            "E = mc² = 2 × (3 × 10⁸)² = 1.8 × 10¹⁷ J.",
        ),
        entry(
            "q-em-hard",
            "energy-mass",
            "A particle with rest mass m_0 moves at 0.8c. What is its total energy?",
            Difficulty::Hard,
            [
                r"\gamma m_0 c^2 where \gamma = \frac{5}{3}",
                "m_0 c^2",
                "0.8 m_0 c^2",
                r"\gamma m_0 c^2 where \gamma = 2",
            ],
            "At 0.8c the Lorentz factor is 1/√(1 - 0.64) = 5/3, so E = γm₀c².",
        ),
        entry(
            "q-ns-easy",
            "newton-second",
            r#"In F = ma, what does "a" represent?"#,
            Difficulty::Easy,
            ["Acceleration", "Area", "Amplitude", "Angular momentum"],
            "Newton's second law relates force to mass times acceleration.",
        ),
        entry(
            "q-ns-med",
            "newton-second",
            "A 4 kg mass accelerates at 3 m/s². What net force acts on it?",
            Difficulty::Medium,
            ["12 N", "7 N", "0.75 N", "1.33 N"],
            "F = ma = 4 kg × 3 m/s² = 12 N.",
        ),
        entry(
            "q-ns-hard",
            "newton-second",
            "A 2 kg block on a frictionless surface is pushed with 10 N while a 4 N force opposes it. What is its acceleration?",
            Difficulty::Hard,
            ["3 m/s²", "5 m/s²", "7 m/s²", "2 m/s²"],
            "The net force is 10 N - 4 N = 6 N, so a = 6 N / 2 kg = 3 m/s².",
        ),
        entry(
            "q-ke-easy",
            "kinetic-energy",
            "Doubling an object's velocity multiplies its kinetic energy by what factor?",
            Difficulty::Easy,
            ["4", "2", "8", "16"],
            "Kinetic energy grows with the square of velocity.",
        ),
        entry(
            "q-ke-med",
            "kinetic-energy",
            "What is the kinetic energy of a 2 kg mass moving at 3 m/s?",
            Difficulty::Medium,
            ["9 J", "6 J", "18 J", "3 J"],
            "KE = ½ × 2 kg × (3 m/s)² = 9 J.",
        ),
        entry(
            "q-ke-hard",
            "kinetic-energy",
            "A car's kinetic energy is 4.5 × 10⁵ J at 30 m/s. What is its mass?",
            Difficulty::Hard,
            ["1000 kg", "500 kg", "1500 kg", "2000 kg"],
            "m = 2KE / v² = 9 × 10⁵ / 900 = 1000 kg.",
        ),
        entry(
            "q-py-easy",
            "pythagorean",
            "In a right triangle, if a = 3 and b = 4, what is c?",
            Difficulty::Easy,
            ["5", "7", "6", "25"],
            "c = √(3² + 4²) = √25 = 5.",
        ),
        entry(
            "q-py-med",
            "pythagorean",
            "If c = 13 and a = 5, what is b?",
            Difficulty::Medium,
            ["12", "8", "10", "144"],
            "b = √(13² - 5²) = √144 = 12.",
        ),
        entry(
            "q-py-hard",
            "pythagorean",
            "Prove the Pythagorean theorem using similar triangles. Which is the key step?",
            Difficulty::Hard,
            [
                "Drop altitude from right angle to hypotenuse, creating similar triangles",
                "Use trigonometric identities",
                "Apply calculus differentiation",
                "Sum interior angles",
            ],
            "The altitude from the right angle creates two triangles similar to the whole.",
        ),
        entry(
            "q-qf-easy",
            "quadratic-formula",
            "In the quadratic formula, what expression sits under the square root?",
            Difficulty::Easy,
            ["b² - 4ac", "b² + 4ac", "4ac - b²", "2ab - c²"],
            "The discriminant b² - 4ac decides how many real roots exist.",
        ),
        entry(
            "q-qf-med",
            "quadratic-formula",
            "How many real roots does x² - 4x + 4 = 0 have?",
            Difficulty::Medium,
            [
                "One repeated root",
                "Two distinct roots",
                "No real roots",
                "Three roots",
            ],
            "The discriminant is 16 - 16 = 0, giving a single repeated root x = 2.",
        ),
        entry(
            "q-qf-hard",
            "quadratic-formula",
            "For which k does x² + kx + 9 = 0 have exactly one real solution?",
            Difficulty::Hard,
            ["k = ±6", "k = ±3", "k = 9", "k = 0"],
            "A single solution needs discriminant k² - 36 = 0, so k = ±6.",
        ),
        entry(
            "q-dp-easy",
            "derivative-power",
            "What is the derivative of x³?",
            Difficulty::Easy,
            ["3x²", "x²", "3x", "x³/3"],
            "The power rule brings the exponent down and lowers it by one.",
        ),
        entry(
            "q-dp-med",
            "derivative-power",
            "What is the derivative of 5x⁴?",
            Difficulty::Medium,
            ["20x³", "5x³", "20x⁴", "4x³"],
            "d/dx 5x⁴ = 5 × 4x³ = 20x³.",
        ),
        entry(
            "q-dp-hard",
            "derivative-power",
            "What is the derivative of x⁻²?",
            Difficulty::Hard,
            ["-2x⁻³", "2x⁻¹", "-2x⁻¹", "x⁻³"],
            "The power rule holds for negative exponents: -2x⁻³.",
        ),
    ]
}

fn subject(id: &str, name: &str, description: &str) -> Subject {
    Subject {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
    }
}

fn concept(id: &str, name: &str, prompt: &str, explanation: &str) -> Concept {
    Concept {
        id: id.to_string(),
        name: name.to_string(),
        prompt: prompt.to_string(),
        explanation: explanation.to_string(),
    }
}

fn entry(
    id: &str,
    concept_id: &str,
    text: &str,
    difficulty: Difficulty,
    options: [&str; 4],
    explanation: &str,
) -> CatalogQuestion {
    let option_ids = ["a", "b", "c", "d"];
    CatalogQuestion {
        question: Question {
            id: id.to_string(),
            concept_id: concept_id.to_string(),
            text: text.to_string(),
            options: option_ids
                .iter()
                .zip(options)
                .map(|(id, text)| AnswerOption {
                    id: id.to_string(),
                    text: text.to_string(),
                })
                .collect(),
            difficulty,
        },
        correct_option_id: "a".to_string(),
        explanation: explanation.to_string(),
    }
}
