use serde::Serialize;

pub const ARTICLES_PER_PAGE: i64 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub number: i64,
    pub num_pages: i64,
    pub per_page: i64,
    pub total: i64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PageInfo {
    /// 非法页码回退到第一页，超出范围取最后一页
    pub fn resolve(requested: Option<&str>, total: i64, per_page: i64) -> Self {
        let per_page = per_page.max(1);
        let num_pages = ((total + per_page - 1) / per_page).max(1);
        let number = requested
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|n| *n >= 1)
            .map(|n| n.min(num_pages))
            .unwrap_or(1);

        Self {
            number,
            num_pages,
            per_page,
            total,
            has_previous: number > 1,
            has_next: number < num_pages,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.per_page
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub page: PageInfo,
}
