//! Printable faculty report.
//!
//! The report is first laid out as styled text lines, then split into A4
//! pages and drawn with the built-in Helvetica faces, so no font files are
//! needed at runtime.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use sqlx::SqlitePool;
use tracing::info;

use super::dashboard::{self, Report};
use super::export::{generated_at, timestamp};
use crate::db::departments;
use crate::db::stats::{self, DateRange, EntityCounts};
use crate::error::AppError;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const USABLE_HEIGHT: f32 = PAGE_HEIGHT - 2.0 * MARGIN;
/// Left edge of each table column, relative to the margin.
const COLUMN_X: [f32; 4] = [0.0, 85.0, 115.0, 145.0];
const NAME_MAX_CHARS: usize = 40;

#[derive(Debug, Clone)]
pub struct PdfExport {
    pub filename: String,
    pub body: Vec<u8>,
}

/// Everything printed in the faculty report.
#[derive(Debug)]
pub struct FacultyReport {
    pub report: Report,
    pub counts: EntityCounts,
    pub departments: usize,
    pub generated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Title,
    Heading,
    TableHeader,
    Body,
}

impl Style {
    fn size(self) -> f32 {
        match self {
            Style::Title => 18.0,
            Style::Heading => 13.0,
            Style::TableHeader | Style::Body => 10.0,
        }
    }

    fn height(self) -> f32 {
        match self {
            Style::Title => 12.0,
            Style::Heading => 10.0,
            Style::TableHeader | Style::Body => 6.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Line {
    style: Style,
    cells: Vec<String>,
}

impl Line {
    fn new<I, S>(style: Style, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            style,
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }

    fn text(style: Style, text: impl Into<String>) -> Self {
        Self {
            style,
            cells: vec![text.into()],
        }
    }
}

fn period(range_start: Option<chrono::NaiveDate>, range_end: Option<chrono::NaiveDate>) -> String {
    format!(
        "{} to {}",
        range_start.map_or("All Time".to_string(), |d| d.to_string()),
        range_end.map_or("Present".to_string(), |d| d.to_string())
    )
}

fn report_lines(data: &FacultyReport) -> Vec<Line> {
    let report = &data.report;
    let counts = &data.counts;
    let mut lines = vec![
        Line::text(Style::Title, "Faculty Report"),
        Line::text(Style::Body, format!("Generated: {}", data.generated_at)),
        Line::text(
            Style::Body,
            format!("Period: {}", period(report.start_date, report.end_date)),
        ),
        Line::text(Style::Heading, "Summary"),
        Line::text(
            Style::Body,
            format!(
                "Teachers: {} ({} active)",
                counts.total_teachers, counts.active_teachers
            ),
        ),
        Line::text(Style::Body, format!("Departments: {}", data.departments)),
        Line::text(Style::Body, format!("Programs: {}", counts.total_programs)),
        Line::text(Style::Body, format!("Subjects: {}", counts.total_subjects)),
        Line::text(
            Style::Body,
            format!("Sessions in period: {}", report.total_sessions),
        ),
        Line::text(
            Style::Body,
            format!("Teaching hours in period: {:.2}", report.total_hours),
        ),
        Line::text(Style::Heading, "Teacher Performance"),
    ];

    let active: Vec<_> = report
        .teacher_utilization
        .iter()
        .filter(|w| w.session_count > 0)
        .collect();
    if active.is_empty() {
        lines.push(Line::text(Style::Body, "No sessions in this period"));
    } else {
        lines.push(Line::new(Style::TableHeader, ["Teacher", "Sessions", "Hours"]));
        for workload in &active {
            let name: String = format!("{} {}", workload.first_name, workload.last_name)
                .chars()
                .take(NAME_MAX_CHARS)
                .collect();
            lines.push(Line::new(
                Style::Body,
                [
                    name,
                    workload.session_count.to_string(),
                    format!("{:.2}", workload.total_hours),
                ],
            ));
        }
        let total: f64 = active.iter().map(|w| w.total_hours).sum();
        lines.push(Line::new(
            Style::TableHeader,
            ["Total".to_string(), String::new(), format!("{:.2}", total)],
        ));
    }

    lines.push(Line::text(Style::Heading, "Departments"));
    if report.department_stats.is_empty() {
        lines.push(Line::text(Style::Body, "No departments"));
    } else {
        lines.push(Line::new(
            Style::TableHeader,
            ["Department", "Teachers", "Subjects", "Sessions"],
        ));
        for department in &report.department_stats {
            lines.push(Line::new(
                Style::Body,
                [
                    department.name.chars().take(NAME_MAX_CHARS).collect::<String>(),
                    department.teacher_count.to_string(),
                    department.subject_count.to_string(),
                    department.session_count.to_string(),
                ],
            ));
        }
    }

    lines.push(Line::text(Style::Heading, "Weekly Trend"));
    lines.push(Line::new(Style::TableHeader, ["Week", "From", "To", "Sessions"]));
    for week in &report.weekly_trends {
        lines.push(Line::new(
            Style::Body,
            [
                week.week.clone(),
                week.start.to_string(),
                week.end.to_string(),
                week.count.to_string(),
            ],
        ));
    }
    lines
}

/// Splits `lines` into runs that fit the printable height of one page.
fn paginate(lines: &[Line]) -> Vec<&[Line]> {
    let mut pages = Vec::new();
    let mut start = 0;
    let mut used = 0.0;
    for (i, line) in lines.iter().enumerate() {
        let height = line.style.height();
        if used + height > USABLE_HEIGHT && i > start {
            pages.push(&lines[start..i]);
            start = i;
            used = 0.0;
        }
        used += height;
    }
    if start < lines.len() || pages.is_empty() {
        pages.push(&lines[start..]);
    }
    pages
}

fn draw_page(
    layer: &PdfLayerReference,
    lines: &[Line],
    regular: &IndirectFontRef,
    bold: &IndirectFontRef,
) {
    let mut y = PAGE_HEIGHT - MARGIN;
    for line in lines {
        y -= line.style.height();
        let font = if line.style == Style::Body { regular } else { bold };
        for (cell, x) in line.cells.iter().zip(COLUMN_X) {
            layer.use_text(cell.as_str(), line.style.size(), Mm(MARGIN + x), Mm(y), font);
        }
    }
}

fn pdf_error<E: std::fmt::Debug>(err: E) -> AppError {
    AppError::Pdf(format!("{:?}", err))
}

pub fn render_report(data: &FacultyReport) -> Result<Vec<u8>, AppError> {
    let lines = report_lines(data);
    let pages = paginate(&lines);

    let (doc, first_page, first_layer) =
        PdfDocument::new("Faculty Report", Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Page 1");
    let regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;

    for (n, page_lines) in pages.iter().enumerate() {
        let layer = if n == 0 {
            doc.get_page(first_page).get_layer(first_layer)
        } else {
            let (page, page_layer) =
                doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Page {}", n + 1));
            doc.get_page(page).get_layer(page_layer)
        };
        draw_page(&layer, page_lines, &regular, &bold);
    }

    doc.save_to_bytes().map_err(pdf_error)
}

pub async fn faculty_report_pdf(db: &SqlitePool, range: DateRange) -> Result<PdfExport, AppError> {
    let data = FacultyReport {
        report: dashboard::report(db, range).await?,
        counts: stats::fetch_entity_counts(db).await?,
        departments: departments::fetch_departments(db).await?.len(),
        generated_at: generated_at(),
    };
    info!(
        "rendering faculty report with {} sessions",
        data.report.total_sessions
    );

    let body = tokio::task::spawn_blocking(move || render_report(&data))
        .await
        .map_err(|_| AppError::InternalServerError)??;

    Ok(PdfExport {
        filename: format!("faculty_report_{}.pdf", timestamp()),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::stats::DepartmentStats;
    use crate::models::TeacherWorkload;
    use crate::services::dashboard::WeeklyCount;
    use chrono::NaiveDate;

    fn workload(i: usize, sessions: i64) -> TeacherWorkload {
        TeacherWorkload {
            id: format!("t{}", i),
            first_name: format!("Teacher{}", i),
            last_name: "Sen".to_string(),
            total_hours: sessions as f64 * 1.5,
            session_count: sessions,
        }
    }

    fn sample(teachers: usize) -> FacultyReport {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        FacultyReport {
            report: Report {
                start_date: Some(start),
                end_date: Some(end),
                teacher_utilization: (0..teachers)
                    .map(|i| workload(i, if i == 0 { 0 } else { 2 }))
                    .collect(),
                department_stats: vec![DepartmentStats {
                    id: "d1".to_string(),
                    name: "Basic Sciences".to_string(),
                    teacher_count: teachers as i64,
                    subject_count: 3,
                    session_count: 4,
                }],
                weekly_trends: vec![WeeklyCount {
                    week: "Week 8".to_string(),
                    start,
                    end,
                    count: 4,
                }],
                total_sessions: 4,
                total_hours: 6.0,
            },
            counts: EntityCounts {
                total_teachers: teachers as i64,
                active_teachers: teachers as i64,
                total_subjects: 3,
                active_subjects: 3,
                total_programs: 1,
                total_sessions: 4,
                scheduled_sessions: 4,
            },
            departments: 1,
            generated_at: "2024-03-10 18:00:00".to_string(),
        }
    }

    fn texts(lines: &[Line]) -> Vec<String> {
        lines.iter().map(|l| l.cells.join(" | ")).collect()
    }

    #[test]
    fn performance_table_lists_only_teachers_with_sessions() {
        let lines = texts(&report_lines(&sample(3)));

        assert!(lines.contains(&"Period: 2024-03-01 to 2024-03-10".to_string()));
        assert!(lines.contains(&"Teaching hours in period: 6.00".to_string()));
        assert!(lines.contains(&"Teacher1 Sen | 2 | 3.00".to_string()));
        assert!(lines.contains(&"Teacher2 Sen | 2 | 3.00".to_string()));
        assert!(!lines.iter().any(|l| l.starts_with("Teacher0 Sen")));
        assert!(lines.contains(&"Total |  | 6.00".to_string()));
        assert!(lines.contains(&"Basic Sciences | 3 | 3 | 4".to_string()));
        assert!(lines.contains(&"Week 8 | 2024-03-01 | 2024-03-10 | 4".to_string()));
    }

    #[test]
    fn empty_period_says_so() {
        let lines = texts(&report_lines(&sample(1)));
        assert!(lines.contains(&"No sessions in this period".to_string()));
    }

    #[test]
    fn long_reports_span_several_pages() {
        let lines = report_lines(&sample(80));
        let pages = paginate(&lines);

        assert!(pages.len() > 1);
        assert_eq!(pages.iter().map(|p| p.len()).sum::<usize>(), lines.len());
        for page in &pages {
            let height: f32 = page.iter().map(|l| l.style.height()).sum();
            assert!(height <= USABLE_HEIGHT);
        }
        assert_eq!(paginate(&report_lines(&sample(2))).len(), 1);
    }

    #[test]
    fn rendered_report_is_a_pdf() {
        let bytes = render_report(&sample(80)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
