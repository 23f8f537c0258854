use chrono::NaiveDate;

/// One scraped profile page.
///
/// `url` is the unique key across the cumulative database. Every other text
/// field may be empty when the page did not carry it; a partially extracted
/// profile is still a valid record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
    pub url: String,
    pub title: String,
    pub username: String,
    pub description: String,
    pub price: String,
    pub phone: String,
    pub skype: String,
    pub kik: String,
    /// Name shown in the `Posted by:` row. The same text as `username`.
    pub posted_by: String,
    pub posted_time: String,
    /// Image URLs in page order. Duplicates are kept as encountered.
    pub image_urls: Vec<String>,
    /// Date the record was first captured.
    pub scrape_date: NaiveDate,
}

impl ProfileRecord {
    /// Creates a record with every extracted field empty.
    #[must_use]
    pub fn empty(url: impl Into<String>, scrape_date: NaiveDate) -> Self {
        Self {
            url: url.into(),
            title: String::new(),
            username: String::new(),
            description: String::new(),
            price: String::new(),
            phone: String::new(),
            skype: String::new(),
            kik: String::new(),
            posted_by: String::new(),
            posted_time: String::new(),
            image_urls: Vec::new(),
            scrape_date,
        }
    }

    #[must_use]
    pub fn image_count(&self) -> usize {
        self.image_urls.len()
    }
}
