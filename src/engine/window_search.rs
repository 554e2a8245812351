// ==========================================
// 机位维护排程系统 - 时间窗搜索与评分
// ==========================================
// 职责: 在搜索范围内枚举候选时间窗并打分排序
// 输入: resource_id + 时长 + 搜索范围 + 约束
// 输出: Vec<SchedulingWindow>（按得分降序，稳定排序）
// 红线: 只读；只查询一次存储，逐步游标在内存中判定重叠
// ==========================================

use crate::config::SchedulerConfig;
use crate::domain::interval::TimeInterval;
use crate::domain::maintenance::{MaintenanceRecord, SchedulingConstraints};
use crate::domain::schedule::SchedulingWindow;
use crate::domain::types::{MaintenanceStatus, Priority};
use crate::engine::error::{SchedulingError, SchedulingResult};
use crate::repository::maintenance_repo::MaintenanceRecordStore;
use chrono::{DateTime, Datelike, Duration, FixedOffset, Timelike, Utc, Weekday};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::instrument;

// ===== 评分常量 =====
const BASE_SCORE: f64 = 100.0;
const OVERLAP_PENALTY: f64 = 30.0;
const DISTANCE_PENALTY_PER_DAY: f64 = 5.0;
const BUSINESS_HOUR_BONUS: f64 = 20.0;
const WEEKDAY_BONUS: f64 = 10.0;

// ===== 营业时段（本地时间，秒） =====
const BUSINESS_OPEN_SECS: u32 = 8 * 3600;
const BUSINESS_CLOSE_SECS: u32 = 18 * 3600;

/// 批次内已占用但尚未落库的时段
#[derive(Debug, Clone, PartialEq)]
pub struct TentativeReservation {
    pub label: String,
    pub priority: Priority,
    pub interval: TimeInterval,
}

// ==========================================
// WindowSearcher - 时间窗搜索引擎
// ==========================================
pub struct WindowSearcher {
    store: Arc<dyn MaintenanceRecordStore>,
    config: SchedulerConfig,
}

impl WindowSearcher {
    pub fn new(store: Arc<dyn MaintenanceRecordStore>, config: SchedulerConfig) -> Self {
        Self { store, config }
    }

    /// 搜索候选时间窗
    ///
    /// # 参数
    /// - search_start: 缺省为当前时间
    /// - search_end: 缺省为 search_start + 搜索范围天数
    ///
    /// # 返回
    /// - 搜索范围为空或短于时长时返回空列表（含时长超出可表示范围）
    /// - 时长非正时返回 InvalidInterval
    pub fn find_windows(
        &self,
        resource_id: &str,
        duration: Duration,
        search_start: Option<DateTime<Utc>>,
        search_end: Option<DateTime<Utc>>,
        constraints: Option<&SchedulingConstraints>,
    ) -> SchedulingResult<Vec<SchedulingWindow>> {
        let start = search_start.unwrap_or_else(Utc::now);
        let end = search_end.unwrap_or_else(|| self.config.search_end_from(start));
        self.search(resource_id, duration, start, end, constraints, &[])
    }

    /// 搜索候选时间窗（附带批次内占位）
    #[instrument(skip_all, fields(resource_id = %resource_id, reservations = reservations.len()))]
    pub fn search(
        &self,
        resource_id: &str,
        duration: Duration,
        search_start: DateTime<Utc>,
        search_end: DateTime<Utc>,
        constraints: Option<&SchedulingConstraints>,
        reservations: &[TentativeReservation],
    ) -> SchedulingResult<Vec<SchedulingWindow>> {
        if duration <= Duration::zero() {
            return Err(SchedulingError::InvalidInterval(format!(
                "时长必须为正，实际 {} 分钟",
                duration.num_minutes()
            )));
        }
        if search_start >= search_end || duration > search_end - search_start {
            return Ok(Vec::new());
        }

        let existing = self.store.find_overlapping(
            resource_id,
            search_start,
            search_end,
            &MaintenanceStatus::ACTIVE,
            None,
        )?;

        let offset = self.config.local_offset();
        let step = self.config.search_step();
        let preferred_start = constraints.and_then(|c| c.preferred_start);

        let mut windows = Vec::new();
        let mut cursor = Some(search_start);
        while let Some(start) = cursor {
            let end = match start.checked_add_signed(duration) {
                Some(end) if end <= search_end => end,
                _ => break,
            };
            cursor = start.checked_add_signed(step);
            let interval = TimeInterval::new(start, end)?;

            if let Some(c) = constraints {
                if !satisfies_constraints(c, &interval, offset) {
                    continue;
                }
            }

            let conflicting_ids = overlapping_ids(&interval, &existing, reservations);
            let score = score_window(&interval, conflicting_ids.len(), preferred_start, offset);

            windows.push(SchedulingWindow {
                resource_id: resource_id.to_string(),
                interval,
                available: conflicting_ids.is_empty(),
                score,
                conflicting_ids,
            });
        }

        // sort_by 为稳定排序，同分时保持时间先后
        windows.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        tracing::debug!(
            candidate_count = windows.len(),
            existing_count = existing.len(),
            "时间窗搜索完成"
        );

        Ok(windows)
    }
}

fn overlapping_ids(
    interval: &TimeInterval,
    existing: &[MaintenanceRecord],
    reservations: &[TentativeReservation],
) -> Vec<String> {
    existing
        .iter()
        .filter(|r| r.overlaps(interval))
        .map(|r| r.id.clone())
        .chain(
            reservations
                .iter()
                .filter(|r| r.interval.overlaps(interval))
                .map(|r| r.label.clone()),
        )
        .collect()
}

/// 硬约束判定（营业时段 / 仅周末 / 维护窗口）
pub fn satisfies_constraints(
    constraints: &SchedulingConstraints,
    interval: &TimeInterval,
    offset: FixedOffset,
) -> bool {
    let local_start = interval.start().with_timezone(&offset);
    let local_end = interval.end().with_timezone(&offset);

    if constraints.business_hours {
        let same_day = local_start.date_naive() == local_end.date_naive();
        if !same_day
            || local_start.num_seconds_from_midnight() < BUSINESS_OPEN_SECS
            || local_end.num_seconds_from_midnight() > BUSINESS_CLOSE_SECS
        {
            return false;
        }
    }

    if constraints.weekends_only
        && !is_weekend(local_start.weekday())
        && !is_weekend(local_end.weekday())
    {
        return false;
    }

    if !constraints.maintenance_windows.is_empty()
        && !constraints
            .maintenance_windows
            .iter()
            .any(|w| w.contains(local_start.time()))
    {
        return false;
    }

    true
}

/// 候选时间窗评分
///
/// - 基础分 100
/// - 每个重叠 −30
/// - 距偏好起点每天 −5（按小数天计）
/// - 本地起始小时在 [8, 17] +20
/// - 周一至周五 +10
/// - 不低于 0
pub fn score_window(
    interval: &TimeInterval,
    overlap_count: usize,
    preferred_start: Option<DateTime<Utc>>,
    offset: FixedOffset,
) -> f64 {
    let mut score = BASE_SCORE - OVERLAP_PENALTY * overlap_count as f64;

    if let Some(preferred) = preferred_start {
        let distance_days = (interval.start() - preferred).num_seconds().abs() as f64 / 86_400.0;
        score -= DISTANCE_PENALTY_PER_DAY * distance_days;
    }

    let local_start = interval.start().with_timezone(&offset);
    if (8..=17).contains(&local_start.hour()) {
        score += BUSINESS_HOUR_BONUS;
    }
    if !is_weekend(local_start.weekday()) {
        score += WEEKDAY_BONUS;
    }

    score.max(0.0)
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::maintenance::MaintenanceWindowSpec;
    use crate::repository::memory_store::InMemoryMaintenanceStore;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    // 2026-03-10 为周二，2026-03-14 为周六
    fn at(day: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, h, 0, 0).unwrap()
    }

    fn iv(day: u32, sh: u32, eh: u32) -> TimeInterval {
        TimeInterval::new(at(day, sh), at(day, eh)).unwrap()
    }

    fn searcher() -> WindowSearcher {
        WindowSearcher::new(
            Arc::new(InMemoryMaintenanceStore::new()),
            SchedulerConfig::default(),
        )
    }

    #[test]
    fn test_score_components() {
        // 周二 10:00，无重叠，无偏好
        assert_eq!(score_window(&iv(10, 10, 12), 0, None, utc()), 130.0);
        // 周二 20:00
        assert_eq!(score_window(&iv(10, 20, 22), 0, None, utc()), 110.0);
        // 周六 10:00，一个重叠
        assert_eq!(score_window(&iv(14, 10, 12), 1, None, utc()), 90.0);
        // 偏好起点相差 1 天
        assert_eq!(score_window(&iv(11, 10, 12), 0, Some(at(10, 10)), utc()), 125.0);
        // 下限为 0
        assert_eq!(score_window(&iv(14, 2, 4), 5, None, utc()), 0.0);
    }

    #[test]
    fn test_business_hours_constraint() {
        let c = SchedulingConstraints::business_hours();
        assert!(satisfies_constraints(&c, &iv(10, 8, 10), utc()));
        assert!(satisfies_constraints(&c, &iv(10, 16, 18), utc()));
        assert!(!satisfies_constraints(&c, &iv(10, 7, 9), utc()));
        assert!(!satisfies_constraints(&c, &iv(10, 17, 19), utc()));
    }

    #[test]
    fn test_business_hours_uses_local_offset() {
        let c = SchedulingConstraints::business_hours();
        let plus8 = FixedOffset::east_opt(8 * 3600).unwrap();
        // UTC 01:00-03:00 = 本地 09:00-11:00
        assert!(satisfies_constraints(&c, &iv(10, 1, 3), plus8));
        assert!(!satisfies_constraints(&c, &iv(10, 1, 3), utc()));
    }

    #[test]
    fn test_weekends_and_maintenance_windows() {
        let weekends = SchedulingConstraints {
            weekends_only: true,
            ..SchedulingConstraints::default()
        };
        assert!(satisfies_constraints(&weekends, &iv(14, 10, 12), utc()));
        assert!(!satisfies_constraints(&weekends, &iv(10, 10, 12), utc()));

        let night = SchedulingConstraints {
            maintenance_windows: vec![MaintenanceWindowSpec::parse("22:00-06:00").unwrap()],
            ..SchedulingConstraints::default()
        };
        assert!(satisfies_constraints(&night, &iv(10, 2, 4), utc()));
        assert!(!satisfies_constraints(&night, &iv(10, 10, 12), utc()));
    }

    #[test]
    fn test_empty_range_and_invalid_duration() {
        let s = searcher();
        let empty = s
            .find_windows("S1", Duration::hours(2), Some(at(10, 12)), Some(at(10, 12)), None)
            .unwrap();
        assert!(empty.is_empty());

        let too_short = s
            .find_windows("S1", Duration::hours(5), Some(at(10, 10)), Some(at(10, 12)), None)
            .unwrap();
        assert!(too_short.is_empty());

        assert!(matches!(
            s.find_windows("S1", Duration::zero(), Some(at(10, 10)), Some(at(10, 12)), None),
            Err(SchedulingError::InvalidInterval(_))
        ));
    }

    #[test]
    fn test_oversized_duration_and_range_near_max() {
        let s = searcher();
        let oversized = s
            .find_windows("S1", Duration::days(200_000_000), Some(at(10, 0)), Some(at(11, 0)), None)
            .unwrap();
        assert!(oversized.is_empty());

        // 默认搜索范围越过最大时刻时截断，不溢出
        let near_max = DateTime::<Utc>::MAX_UTC - Duration::minutes(90);
        let windows = s
            .find_windows("S1", Duration::hours(1), Some(near_max), None, None)
            .unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].interval.start(), near_max);
    }

    #[test]
    fn test_reservations_count_as_overlaps() {
        let s = searcher();
        let reservation = TentativeReservation {
            label: "urgent-1".to_string(),
            priority: Priority::Urgent,
            interval: iv(10, 10, 12),
        };
        let preferred = SchedulingConstraints::default().with_preferred_start(at(10, 11));

        let windows = s
            .search(
                "S1",
                Duration::hours(2),
                at(10, 11),
                at(10, 16),
                Some(&preferred),
                &[reservation],
            )
            .unwrap();

        assert_eq!(windows[0].interval, iv(10, 12, 14));
        assert!(windows[0].available);

        let overlapped = windows
            .iter()
            .find(|w| w.interval == iv(10, 11, 13))
            .unwrap();
        assert!(!overlapped.available);
        assert_eq!(overlapped.conflicting_ids, vec!["urgent-1".to_string()]);
    }
}
