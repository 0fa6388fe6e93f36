//! Fixed benchmark questions and answer export.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;

use crate::chain::QuestionAnswerer;

/// The sixteen benchmark questions, in grading order.
pub const EVALUATION_QUESTIONS: [&str; 16] = [
    "پرسش ۱: توروالدز برای کار در چه موسسه‌ای دانشگاه هلسینکی را ترک گفت؟",
    "پرسش ۲: آندرو تاننباوم استاد کدام دانشگاه است؟",
    "پرسش ۳: در سال ۲۰۰۶ چند درصد از هسته لینوکس توسط توروالدز نوشته شد (به عدد)؟",
    "پرسش ۴: چه کسی بنیاد نرم‌افزارهای آزاد را بنا نهاد؟",
    "پرسش ۵: ریچارد استالمن در ۲۱ سالگی در کدام شرکت کار می‌کرد؟",
    "پرسش ۶: یکی از مشهورترین پروژه‌هایی که در ابتدا پروژه‌ی آزاد و آکادمیک بود اما بعد وارد محیط بسته‌ی تجاری شد چه بود؟",
    "پرسش ۷: لینکدین در سانسور کردن حساب‌ها به درخواست چه کشوری مشهور است؟",
    "پرسش ۸: ریچارد استالمن پیشنهاد می‌کند به‌جای گوگل مپ از چه سرویسی استفاده کنیم؟",
    "پرسش ۹: آزادی صفرم در نرم‌افزار آزاد چه عنوانی دارد؟",
    "پرسش ۱۰: آیا یک نرم‌افزار آزاد لزوماً رایگان است (بله یا خیر)؟",
    "پرسش ۱۱: استاندارد ناظر بر فایل‌ها و دایرکتوری‌ها به‌اختصار چه نامیده می‌شود؟",
    "پرسش ۱۲: اولین ریپلای به ایمیل درخواست کار چیست؟",
    "پرسش ۱۳: اگر امروز که از شنبه ورزش می‌کنم در واقع دچار چه بایاسی شده‌ایم؟",
    "پرسش ۱۴: دنبال یاد گرفتن کدوم یکی باشیم: برنامه‌نویسی یا دستور زبان یک زبان خاص؟",
    "پرسش ۱۵: اگه هدف‌مون اینه که بریم گوگل کار کنیم اول از همه چه‌چیزی رو سرچ کنیم؟",
    "پرسش ۱۶: در بیانیه‌ی هکرها گفته شده که جرم آن‌ها در یک کلمه چیست؟",
];

/// One graded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// 1-based position in the question list; 0 marks an ad-hoc question.
    pub question_number: usize,
    /// Question text.
    pub question: String,
    /// Short answer returned by the chain.
    pub answer: String,
}

impl AnswerRecord {
    /// Wraps an answer for `question_number`.
    pub fn new(question_number: usize, question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question_number,
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Answers [`EVALUATION_QUESTIONS`] in order.
pub fn run_evaluation(chain: &dyn QuestionAnswerer) -> Result<Vec<AnswerRecord>> {
    run_evaluation_with(chain, &EVALUATION_QUESTIONS)
}

/// Answers `questions` in order, one record per question. The first failing
/// call aborts the run and its error is returned.
pub fn run_evaluation_with(
    chain: &dyn QuestionAnswerer,
    questions: &[&str],
) -> Result<Vec<AnswerRecord>> {
    let mut records = Vec::with_capacity(questions.len());
    for (idx, question) in questions.iter().enumerate() {
        let number = idx + 1;
        let answer = chain
            .answer(question)
            .with_context(|| format!("question {number} failed"))?;
        log::info!("Q{number}: {answer}");
        records.push(AnswerRecord::new(number, *question, answer));
    }
    Ok(records)
}

/// Writes `records` as a pretty JSON array (4-space indent, unescaped
/// UTF-8), replacing any existing file.
pub fn save_answers(records: &[AnswerRecord], path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
    records
        .serialize(&mut serializer)
        .context("failed to serialize answers")?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    log::info!("saved answers to {}", path.display());
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn questions_are_numbered_in_order() {
        for question in EVALUATION_QUESTIONS {
            assert!(question.starts_with("پرسش "), "{question}");
            assert!(question.contains(':'));
        }
        assert!(EVALUATION_QUESTIONS[0].starts_with("پرسش ۱:"));
        assert!(EVALUATION_QUESTIONS[15].starts_with("پرسش ۱۶:"));
    }

    #[test]
    fn saved_json_is_indented_and_unescaped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/answers.json");
        let records = vec![AnswerRecord::new(1, "پرسش", "پاسخ")];
        save_answers(&records, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\n    {\n        \"question_number\": 1,"));
        assert!(written.contains("\"answer\": \"پاسخ\""));

        let parsed: Vec<AnswerRecord> = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, records);
    }
}
