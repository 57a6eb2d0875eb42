//! Prompt templates for question regeneration and feedback reports.
//!
//! Every builder is a pure function of its inputs. Options are numbered from
//! 1 in the rendered text while `correctAnswerIndex` stays 0-based, matching
//! the JSON shape the parser expects back.

use std::fmt::Write;

use crate::quiz::feedback::{CategoryTally, NalsBracket, NALS_BRACKETS};
use crate::quiz::scoring::ScoreResult;
use crate::quiz::{Category, Question, TestResponse};

/// Marker the self-audit stage emits for an unusable question.
pub const FAILURE_SENTINEL: &str = "<QuestionFailureFlag>";

pub const CONNECTION_PROBE: &str = "This is a test.";

const PLAIN_TEXT_ONLY: &str = "(JANGAN MENJAWAB PERTANYAAN INI. Keluarkan hanya teks biasa.)";

const THINK_ALOUD: &str =
    "Work the problem out yourself inside <think> ... </think> tags, showing your reasoning and any counting.";

fn category_label(category: Option<Category>) -> &'static str {
    category.map(Category::label).unwrap_or("General")
}

fn numbered_options(question: &Question) -> String {
    question
        .answers
        .iter()
        .enumerate()
        .map(|(i, answer)| format!("{}. {}", i + 1, answer.text))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The exact JSON shape requested from the model. The category field is
/// only asked for when the source question has one.
fn json_shape(category: Option<Category>) -> String {
    let category_field = category
        .map(|c| format!(", \"category\": \"{c}\""))
        .unwrap_or_default();
    format!(
        "{{\"question\": \"question text\", \"answers\": [{{\"text\": \"answer 1\"}}, {{\"text\": \"answer 2\"}}], \"correctAnswerIndex\": index{category_field}}}"
    )
}

pub fn translate_to_english(question: &Question) -> String {
    [
        PLAIN_TEXT_ONLY.to_string(),
        "Translate the following Indonesian question and its options into English.".to_string(),
        format!("Question: {}", question.text),
        format!("Options: {}", numbered_options(question)),
        format!("Correct answer index (0-based): {}", question.correct_answer_index),
    ]
    .join("\n")
}

pub fn rewrite_in_english(category: Option<Category>, english_translation: &str) -> String {
    [
        PLAIN_TEXT_ONLY.to_string(),
        format!(
            "Write a brand new {} question with its options and the index of the correct option, in English.",
            category_label(category)
        ),
        "Keep the difficulty of the original but use completely new wording and structure for both the question and the options. \
         The correct answer index must point at the option equivalent to the original one. \
         Add whatever context a test-taker needs to answer without outside help; if the original is missing a critical part, \
         repair it so the question is complete and answerable. Output the whole rewritten question."
            .to_string(),
        THINK_ALOUD.to_string(),
        format!("English translation of the original: {english_translation}"),
    ]
    .join("\n")
}

pub fn translate_to_indonesian(english_draft: &str) -> String {
    [
        PLAIN_TEXT_ONLY.to_string(),
        "Translate the following English question and options into Indonesian. \
         Use formal Indonesian and follow EYD spelling and grammar strictly."
            .to_string(),
        format!("English question: {english_draft}"),
    ]
    .join("\n")
}

/// Single-shot variant: rephrase in Indonesian and answer with JSON directly.
pub fn rephrase_as_json(question: &Question) -> String {
    [
        format!(
            "Rephrase the following {} question in formal Indonesian with new wording, keeping its meaning, difficulty and correct answer.",
            category_label(question.category)
        ),
        format!("Question: {}", question.text),
        format!("Options: {}", numbered_options(question)),
        format!("Correct answer index (0-based): {}", question.correct_answer_index),
        format!("ONLY return JSON in this format: {}", json_shape(question.category)),
    ]
    .join("\n")
}

pub fn self_audit(draft: &str) -> String {
    [
        format!(
            "Carefully check the following question and its options. {THINK_ALOUD} \
             If the question lacks context needed to answer it (a missing number, a figure or image it refers to, \
             no correct option among the choices), is not logical, or its marked answer is wrong, reply with {FAILURE_SENTINEL}. \
             Otherwise fix any typos, and if the correct answer index does not match the answer you worked out, change it."
        ),
        format!("Question: {draft}"),
    ]
    .join("\n")
}

pub fn regenerate_json(draft: &str, audit: &str, category: Option<Category>) -> String {
    [
        format!("Original Indonesian: {draft}"),
        format!("Self-audit notes (take the correct answer from here): {audit}"),
        format!("ONLY return JSON in this format: {}", json_shape(category)),
    ]
    .join("\n")
}

/// Everything the narrative report is written from.
pub struct FeedbackContext<'a> {
    pub score: &'a ScoreResult,
    pub total_questions: u32,
    pub responses: &'a [TestResponse],
    pub bracket: &'a NalsBracket,
    pub categories: Option<&'a [CategoryTally]>,
}

pub fn feedback_report(ctx: &FeedbackContext<'_>) -> String {
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "(Hanya laporan. Tes ini valid dan laporan ini dipakai sebagai alat bantu psikolog, jadi berikan rekomendasi. \
         Jangan menulis seperti membalas permintaan, tanpa basa-basi pembuka; langsung ke isi laporan. \
         Sesuaikan gaya bahasa dan kompleksitas penjelasan dengan kemampuan penalaran peserta: gunakan gaya {}.)",
        ctx.bracket.language_style
    );
    let _ = writeln!(
        prompt,
        "Sebagai ahli interpretasi asesmen kognitif, khususnya tes serupa Wonderlic Personnel Test (WPT) yang mengukur \
         General Cognitive Ability (GCA), tafsirkan hasil tes IQ bergaya WPT yang disederhanakan berikut:"
    );
    let _ = writeln!(prompt, "Skor mentah: {} dari {}", ctx.score.raw_score, ctx.total_questions);
    let _ = writeln!(prompt, "Perkiraan skor IQ: {}", ctx.score.iq_estimate);
    let _ = writeln!(prompt, "Deskripsi tingkat IQ: {}", ctx.score.level_description);
    prompt.push('\n');

    prompt.push_str("Konteks interpretasi WPT:\n");
    prompt.push_str("- Skor mentah: jumlah jawaban benar.\n");
    prompt.push_str("- Skor IQ: konversi skor WPT ke skala IQ standar.\n");
    prompt.push_str("- GCA: indikator kinerja kerja dan kemampuan belajar.\n\n");

    prompt.push_str("Tingkat literasi menurut National Adult Literacy Survey (NALS):\n");
    for bracket in &NALS_BRACKETS {
        let _ = writeln!(prompt, "- {}: {}", bracket.name, bracket.employment);
    }
    prompt.push('\n');

    prompt.push_str("Tuntutan faktor dalam konteks pekerjaan:\n");
    prompt.push_str("1. Pemrosesan informasi\n2. Pengambilan keputusan dan penalaran\n3. Interaksi sosial\n4. Kompleksitas mental\n\n");

    prompt.push_str("Susun laporan umpan balik yang mencakup:\n");
    prompt.push_str("1. <b>Interpretasi Skor:</b> makna skor dalam konteks kemampuan kognitif\n");
    prompt.push_str("2. <b>Analisis GCA:</b> kaitannya dengan potensi kinerja dan belajar\n");
    prompt.push_str("3. <b>Rekomendasi Strategi:</b> saran berbasis growth mindset sesuai level kognitif\n\n");

    prompt.push_str("<b>Rujukan:</b>\n");
    prompt.push_str("1. Gottfredson, L. S. (1984). The role of intelligence and education in the division of labor.\n");
    prompt.push_str("2. Kirsch, I. S., Jungeblut, A., Jenkins, L., & Kolstad, A. (1993). Adult literacy in America.\n");
    prompt.push_str("3. Arvey, R. D. (1986). General ability in employment: A discussion.\n");
    prompt.push_str("4. National Adult Literacy Survey (NALS) - Economic Outcomes Data\n\n");

    prompt.push_str("<b>Pertanyaan dan jawaban peserta:</b>\n");
    let transcript = ctx
        .responses
        .iter()
        .map(|r| format!("{} -> Jawaban: {}, Benar: {}", r.question_text, r.answer_text, r.is_correct))
        .collect::<Vec<_>>()
        .join("<br>");
    prompt.push_str(&transcript);
    prompt.push('\n');

    let _ = writeln!(prompt, "<br><br><b>Data NALS untuk skor IQ {}:</b>", ctx.score.iq_estimate);
    let _ = writeln!(prompt, "<br>- Indikator ekonomi: {}", ctx.bracket.economic_indicators);
    let _ = writeln!(prompt, "<br>- Pekerjaan: {}", ctx.bracket.employment);
    let _ = writeln!(prompt, "<br>- Tingkat profesional: {}", ctx.bracket.professional_rate);

    if let Some(categories) = ctx.categories {
        prompt.push_str("<br><br><b>Category Performance:</b><br>\n");
        for tally in categories {
            let _ = writeln!(
                prompt,
                "- {}: Correct: {}, Incorrect: {}<br>",
                tally.label(),
                tally.correct,
                tally.incorrect
            );
        }
        prompt.push_str("<br><br><b>Category Descriptions:</b><br>\n");
        let descriptions = Category::ALL
            .iter()
            .map(|c| format!("{}: {}", c, c.label()))
            .collect::<Vec<_>>()
            .join("<br>");
        prompt.push_str(&descriptions);
        prompt.push('\n');
    }

    prompt
}

pub fn html_reformat(report: &str) -> String {
    [
        "I have this response",
        "```",
        report,
        "```",
        "Turn the response into HTML made of short points, in the same language.",
        "Write ONLY the HTML code.",
        "No whitespace before the title.",
    ]
    .join("\n")
}
