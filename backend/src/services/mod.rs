pub mod dashboard;
pub mod export;
pub mod report_pdf;
pub mod seeder;

pub use dashboard::{DashboardStats, Report};
pub use export::CsvExport;
pub use report_pdf::PdfExport;
pub use seeder::{DemoSeeder, SeedOptions, SeedStats};
