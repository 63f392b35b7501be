//! Timetable data and its display formatting.
//!
//! The raw [`Timetable`] comes from a [`super::TimetableSource`]; the
//! functions here turn it into the lesson lines and holiday entries drawn
//! on the wallpaper. The weather text is folded into the last holiday
//! entry so the next-holiday summary and the weather form one text region.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::types::TimetableBlock;

/// Gaps longer than this between lessons are shown as free periods.
const FREE_PERIOD_MIN_GAP_MINUTES: i64 = 15;

/// Maximum number of upcoming holidays listed.
const MAX_LISTED_HOLIDAYS: usize = 10;

const DATE_FORMAT: &str = "%d.%m.%Y";
const TIME_FORMAT: &str = "%H:%M";

const NO_SCHOOL_TEXT: &str = "Heute ist schulfrei!!! :-)";
const HOLIDAY_HEADER: &str = "Nächsten 10 Ferien/Feiertage:\n";
const WEATHER_HEADER: &str = "Wetter an deinem (nicht wirklich genauen) Standort:";
const LESSONS_UNAVAILABLE: &str = "Stundenplan nicht verfügbar";
const HOLIDAYS_UNAVAILABLE: &str = "Ferien nicht verfügbar";

/// Status of a lesson as reported by the timetable service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LessonCode {
    #[default]
    Regular,
    Cancelled,
    Irregular,
}

/// A single lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Short subject name.
    pub subject: Option<String>,
    /// Room name.
    pub room: Option<String>,
    pub code: LessonCode,
    /// Free-text note attached to a substitution.
    pub substitution_text: Option<String>,
}

/// A holiday or school-free period, both dates inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holiday {
    pub name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Raw timetable data for one day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timetable {
    pub lessons: Vec<Lesson>,
    pub holidays: Vec<Holiday>,
}

/// Formats both text regions from fetched data.
#[must_use]
pub fn format_blocks(timetable: &Timetable, weather: &str, today: NaiveDate) -> TimetableBlock {
    TimetableBlock::Available {
        lessons: format_lessons(&timetable.lessons, today),
        holidays: format_holidays(&timetable.holidays, weather, today),
    }
}

/// Placeholder regions used when the timetable could not be fetched.
///
/// The weather text is kept so a weather result (or its error) stays visible.
#[must_use]
pub fn unavailable_block(weather: &str) -> TimetableBlock {
    TimetableBlock::Unavailable {
        lessons: vec![LESSONS_UNAVAILABLE.to_string()],
        holidays: vec![format!(
            "{HOLIDAYS_UNAVAILABLE}\n\n{WEATHER_HEADER}\n{weather}"
        )],
    }
}

/// Formats the lessons of `day`, inserting free periods.
///
/// Lessons are sorted by start time and cancelled ones skipped. The school
/// day is assumed to begin at 08:00, so a late first lesson is preceded by a
/// free period too.
#[must_use]
pub fn format_lessons(lessons: &[Lesson], day: NaiveDate) -> Vec<String> {
    let mut sorted: Vec<&Lesson> = lessons
        .iter()
        .filter(|l| l.code != LessonCode::Cancelled)
        .collect();
    sorted.sort_by_key(|l| l.start);

    let mut lines = Vec::new();
    let mut previous_end = day.and_time(school_day_start());

    for lesson in sorted {
        if (lesson.start - previous_end).num_minutes() > FREE_PERIOD_MIN_GAP_MINUTES {
            lines.push(format!(
                "{} - {}: FREI!!!",
                previous_end.format(TIME_FORMAT),
                lesson.start.format(TIME_FORMAT)
            ));
        }

        lines.push(format_lesson(lesson));
        previous_end = lesson.end;
    }

    if lines.is_empty() {
        lines.push(NO_SCHOOL_TEXT.to_string());
    }
    lines
}

fn format_lesson(lesson: &Lesson) -> String {
    let subject = lesson.subject.as_deref().unwrap_or("Kein Fach");
    let room = lesson.room.as_deref().unwrap_or("Kein Raum");
    let mut line = format!(
        "{} - {}: {subject} in {room}",
        lesson.start.format(TIME_FORMAT),
        lesson.end.format(TIME_FORMAT)
    );

    let note = lesson
        .substitution_text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if lesson.code == LessonCode::Irregular || note.is_some() {
        line.push_str(" (Vertretung)");
    }
    if let Some(note) = note {
        line.push_str(&format!(" [{note}]"));
    }
    line
}

/// Formats the holiday region: a header, up to ten upcoming holidays, and a
/// summary entry with the next holiday and the weather.
#[must_use]
pub fn format_holidays(holidays: &[Holiday], weather: &str, today: NaiveDate) -> Vec<String> {
    let mut sorted: Vec<&Holiday> = holidays.iter().collect();
    sorted.sort_by_key(|h| h.start);

    let mut entries = vec![HOLIDAY_HEADER.to_string()];
    entries.extend(
        sorted
            .iter()
            .filter(|h| h.end > today)
            .take(MAX_LISTED_HOLIDAYS)
            .map(|h| format_holiday(h)),
    );

    let next = sorted
        .iter()
        .find(|h| h.end >= today)
        .map_or_else(|| "keine bekannt".to_string(), |h| next_holiday_text(h, today));

    entries.push(format!(
        "\nNächste(r) Ferien/Feiertag: {next}\n\n{WEATHER_HEADER}\n{weather}"
    ));
    entries
}

fn format_holiday(holiday: &Holiday) -> String {
    if holiday.start == holiday.end {
        format!("{}: {}", holiday.name, holiday.start.format(DATE_FORMAT))
    } else {
        format!(
            "{}: {} - {}",
            holiday.name,
            holiday.start.format(DATE_FORMAT),
            holiday.end.format(DATE_FORMAT)
        )
    }
}

fn next_holiday_text(holiday: &Holiday, today: NaiveDate) -> String {
    if holiday.start <= today && today <= holiday.end {
        format!(
            "\n{}: Wie gesagt, es ist gerade frei!\n(Ja, man muss das zweimal sagen ;) )",
            holiday.name
        )
    } else {
        let days = (holiday.start - today).num_days();
        format!("{}\nIn {days} Tag(en)", holiday.start.format(DATE_FORMAT))
    }
}

fn school_day_start() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(day: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        day.and_hms_opt(h, m, 0).unwrap()
    }

    fn lesson(day: NaiveDate, start: (u32, u32), end: (u32, u32), subject: &str) -> Lesson {
        Lesson {
            start: at(day, start.0, start.1),
            end: at(day, end.0, end.1),
            subject: Some(subject.to_string()),
            room: Some("101".to_string()),
            code: LessonCode::Regular,
            substitution_text: None,
        }
    }

    fn holiday(name: &str, start: NaiveDate, end: NaiveDate) -> Holiday {
        Holiday {
            name: name.to_string(),
            start,
            end,
        }
    }

    // =========================================================================
    // Lessons
    // =========================================================================

    #[test]
    fn test_lessons_sorted_and_formatted() {
        let day = date(2030, 3, 4);
        let lessons = vec![
            lesson(day, (8, 55), (9, 45), "E"),
            lesson(day, (8, 0), (8, 50), "M"),
        ];

        assert_eq!(
            format_lessons(&lessons, day),
            vec!["08:00 - 08:50: M in 101", "08:55 - 09:45: E in 101"]
        );
    }

    #[test]
    fn test_free_period_inserted_for_long_gap() {
        let day = date(2030, 3, 4);
        let lessons = vec![
            lesson(day, (8, 0), (8, 50), "M"),
            lesson(day, (10, 45), (11, 35), "D"),
        ];

        assert_eq!(
            format_lessons(&lessons, day),
            vec![
                "08:00 - 08:50: M in 101",
                "08:50 - 10:45: FREI!!!",
                "10:45 - 11:35: D in 101"
            ]
        );
    }

    #[test]
    fn test_late_start_is_free_period() {
        let day = date(2030, 3, 4);
        let lessons = vec![lesson(day, (9, 50), (10, 40), "BIO")];

        assert_eq!(
            format_lessons(&lessons, day),
            vec!["08:00 - 09:50: FREI!!!", "09:50 - 10:40: BIO in 101"]
        );
    }

    #[test]
    fn test_exactly_fifteen_minutes_is_not_free() {
        let day = date(2030, 3, 4);
        let lessons = vec![
            lesson(day, (8, 0), (8, 50), "M"),
            lesson(day, (9, 5), (9, 55), "E"),
        ];
        assert_eq!(format_lessons(&lessons, day).len(), 2);
    }

    #[test]
    fn test_cancelled_lessons_skipped() {
        let day = date(2030, 3, 4);
        let mut cancelled = lesson(day, (8, 0), (8, 50), "M");
        cancelled.code = LessonCode::Cancelled;
        let lessons = vec![cancelled, lesson(day, (8, 55), (9, 45), "E")];

        assert_eq!(
            format_lessons(&lessons, day),
            vec!["08:00 - 08:55: FREI!!!", "08:55 - 09:45: E in 101"]
        );
    }

    #[test]
    fn test_missing_subject_and_room() {
        let day = date(2030, 3, 4);
        let mut bare = lesson(day, (8, 0), (8, 50), "M");
        bare.subject = None;
        bare.room = None;

        assert_eq!(
            format_lessons(&[bare], day),
            vec!["08:00 - 08:50: Kein Fach in Kein Raum"]
        );
    }

    #[test]
    fn test_substitution_marked() {
        let day = date(2030, 3, 4);
        let mut irregular = lesson(day, (8, 0), (8, 50), "M");
        irregular.code = LessonCode::Irregular;
        let mut noted = lesson(day, (8, 55), (9, 45), "E");
        noted.substitution_text = Some("Raumänderung".to_string());

        assert_eq!(
            format_lessons(&[irregular, noted], day),
            vec![
                "08:00 - 08:50: M in 101 (Vertretung)",
                "08:55 - 09:45: E in 101 (Vertretung) [Raumänderung]"
            ]
        );
    }

    #[test]
    fn test_no_lessons_is_school_free() {
        let day = date(2030, 3, 4);
        assert_eq!(format_lessons(&[], day), vec![NO_SCHOOL_TEXT]);
    }

    // =========================================================================
    // Holidays
    // =========================================================================

    #[test]
    fn test_holiday_list_and_next_holiday() {
        let today = date(2030, 3, 4);
        let holidays = vec![
            holiday("Osterferien", date(2030, 4, 13), date(2030, 4, 22)),
            holiday("Semesterferien", date(2030, 2, 10), date(2030, 2, 15)),
            holiday("Staatsfeiertag", date(2030, 5, 1), date(2030, 5, 1)),
        ];

        let entries = format_holidays(&holidays, "Sonnig", today);

        assert_eq!(
            entries,
            vec![
                HOLIDAY_HEADER.to_string(),
                "Osterferien: 13.04.2030 - 22.04.2030".to_string(),
                "Staatsfeiertag: 01.05.2030".to_string(),
                format!(
                    "\nNächste(r) Ferien/Feiertag: 13.04.2030\nIn 40 Tag(en)\n\n{WEATHER_HEADER}\nSonnig"
                ),
            ]
        );
    }

    #[test]
    fn test_running_holiday() {
        let today = date(2030, 4, 15);
        let holidays = vec![holiday("Osterferien", date(2030, 4, 13), date(2030, 4, 22))];

        let entries = format_holidays(&holidays, "Regen", today);
        let summary = entries.last().unwrap();

        assert!(summary.contains("Osterferien: Wie gesagt, es ist gerade frei!"));
        assert!(summary.ends_with("Regen"));
    }

    #[test]
    fn test_holiday_ending_today_is_next_but_not_listed() {
        let today = date(2030, 4, 22);
        let holidays = vec![
            holiday("Osterferien", date(2030, 4, 13), date(2030, 4, 22)),
            holiday("Staatsfeiertag", date(2030, 5, 1), date(2030, 5, 1)),
        ];

        let entries = format_holidays(&holidays, "", today);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1], "Staatsfeiertag: 01.05.2030");
        assert!(entries[2].contains("Osterferien: Wie gesagt"));
    }

    #[test]
    fn test_at_most_ten_holidays_listed() {
        let today = date(2030, 1, 1);
        let holidays: Vec<Holiday> = (1..=15)
            .map(|i| holiday(&format!("Tag {i}"), date(2030, 2, i), date(2030, 2, i)))
            .collect();

        let entries = format_holidays(&holidays, "", today);

        // Header + 10 holidays + summary.
        assert_eq!(entries.len(), 12);
        assert_eq!(entries[10], "Tag 10: 10.02.2030");
    }

    #[test]
    fn test_no_upcoming_holidays() {
        let today = date(2030, 8, 1);
        let holidays = vec![holiday("Past", date(2030, 2, 10), date(2030, 2, 15))];

        let entries = format_holidays(&holidays, "Wolkig", today);

        assert_eq!(entries.len(), 2);
        assert!(entries[1].contains("Nächste(r) Ferien/Feiertag: keine bekannt"));
        assert!(entries[1].ends_with("Wolkig"));
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    #[test]
    fn test_format_blocks_is_available() {
        let today = date(2030, 3, 4);
        let block = format_blocks(&Timetable::default(), "Sonnig", today);

        assert!(block.is_available());
        assert_eq!(block.lessons(), [NO_SCHOOL_TEXT.to_string()]);
        assert!(block.holidays().last().unwrap().ends_with("Sonnig"));
    }

    #[test]
    fn test_unavailable_block_keeps_weather() {
        let block = unavailable_block("Fehler beim Abrufen der Wetterdaten");

        assert!(!block.is_available());
        assert_eq!(block.lessons(), [LESSONS_UNAVAILABLE.to_string()]);
        assert_eq!(block.holidays().len(), 1);
        assert!(block.holidays()[0].ends_with("Fehler beim Abrufen der Wetterdaten"));
    }
}
