//! Filter → sort → paginate projection of the record store for display.

use crate::domain::record::ResultRecord;
use std::cmp::Ordering;

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Record field the view is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Symbol,
    TotalReturn,
    WinRate,
    TotalTrades,
    FinalBalance,
    MaxDrawdown,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Presentation state owned by the caller. The projection is a pure function
/// of `(records, view state)`; nothing here touches the store.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub filter: String,
    pub page_number: usize,
    pub page_size: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            sort_key: SortKey::Symbol,
            sort_order: SortOrder::Ascending,
            filter: String::new(),
            page_number: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ViewState {
    /// Changing the filter jumps back to the first page; a narrower result
    /// set would otherwise strand the cursor past the end.
    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
        self.page_number = 1;
    }

    /// Changing the sort keeps the current page.
    pub fn set_sort(&mut self, key: SortKey, order: SortOrder) {
        self.sort_key = key;
        self.sort_order = order;
    }

    pub fn set_page(&mut self, page_number: usize) {
        self.page_number = page_number.max(1);
    }
}

/// One displayed page plus the totals the pager needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub records: Vec<ResultRecord>,
    pub total_filtered: usize,
    pub total_pages: usize,
}

/// Projects the store snapshot into the visible page.
///
/// Ties under the sort key keep their store (insertion) order: the sort is
/// stable and the comparator returns an explicit `Equal`, so pagination does
/// not shuffle as new records stream in.
pub fn project(records: &[ResultRecord], view: &ViewState) -> Page {
    let needle = view.filter.to_lowercase();
    let mut filtered: Vec<ResultRecord> = records
        .iter()
        .filter(|r| needle.is_empty() || r.symbol.to_lowercase().contains(&needle))
        .cloned()
        .collect();

    filtered.sort_by(|a, b| {
        let ordering = compare(a, b, view.sort_key);
        match view.sort_order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    });

    let total_filtered = filtered.len();
    let page_size = view.page_size.max(1);
    let total_pages = total_filtered.div_ceil(page_size);

    let start = view.page_number.saturating_sub(1).saturating_mul(page_size);
    let records = if start >= total_filtered {
        Vec::new()
    } else {
        filtered[start..(start + page_size).min(total_filtered)].to_vec()
    };

    Page {
        records,
        total_filtered,
        total_pages,
    }
}

/// Three-way comparator per sort key. String fields compare
/// case-insensitively, numeric fields by value with NaN ordered last.
fn compare(a: &ResultRecord, b: &ResultRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::Symbol => cmp_str(&a.symbol, &b.symbol),
        SortKey::TotalReturn => cmp_f64(a.total_return, b.total_return),
        SortKey::WinRate => cmp_f64(a.win_rate, b.win_rate),
        SortKey::TotalTrades => a.total_trades.cmp(&b.total_trades),
        SortKey::FinalBalance => cmp_f64(a.final_balance, b.final_balance),
        SortKey::MaxDrawdown => cmp_f64(a.max_drawdown, b.max_drawdown),
        SortKey::Status => cmp_str(&a.status.to_string(), &b.status.to_string()),
    }
}

fn cmp_str(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| match (a.is_nan(), b.is_nan()) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => Ordering::Equal,
    })
}
