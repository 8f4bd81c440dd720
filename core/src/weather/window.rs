use super::{
    DailyAggregate,
    WeatherError,
};
use crate::CalendarDate;

/// Prefix-sum rounding must not let a later window beat an equal earlier one.
const TIE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct WindowDay {
    pub date: CalendarDate,
    pub mean_temperature: f64,
    pub max_temperature: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct HottestWindow {
    pub start: CalendarDate,
    pub end: CalendarDate,
    pub length: usize,
    /// 0-based index of the first day within the analysed series.
    pub start_index: usize,
    /// Mean of the daily mean temperatures over the window.
    pub mean_temperature: f64,
    /// Hottest day of the window by daily mean; the earliest one wins a tie.
    pub earliest_hot_day: CalendarDate,
    pub days: Vec<WindowDay>,
}

/// Finds the `length` consecutive days with the highest average daily mean temperature.
///
/// Ties resolve to the earliest window.
pub fn hottest_window(days: &[DailyAggregate], length: usize) -> Result<HottestWindow, WeatherError> {
    if length == 0 || length > days.len() {
        return Err(WeatherError::InvalidWindowSize {
            requested: length,
            available: days.len(),
        });
    }

    let mut prefix = Vec::with_capacity(days.len() + 1);
    prefix.push(0.0);
    for day in days {
        let total = prefix.last().copied().unwrap_or_default();
        prefix.push(total + day.mean);
    }

    let mut best_start = 0;
    let mut best_sum = prefix[length];
    for start in 1..=days.len() - length {
        let sum = prefix[start + length] - prefix[start];
        if sum - best_sum > TIE_TOLERANCE {
            best_start = start;
            best_sum = sum;
        }
    }

    let selected = &days[best_start..best_start + length];
    let mut hottest = &selected[0];
    for day in &selected[1..] {
        if day.mean > hottest.mean {
            hottest = day;
        }
    }

    Ok(HottestWindow {
        start: selected[0].date,
        end: selected[length - 1].date,
        length,
        start_index: best_start,
        mean_temperature: selected.iter().map(|day| day.mean).sum::<f64>() / length as f64,
        earliest_hot_day: hottest.date,
        days: selected
            .iter()
            .map(|day| WindowDay {
                date: day.date,
                mean_temperature: day.mean,
                max_temperature: day.max,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weather::{
        epw::tests::epw_with_daily_temperatures,
        EpwFile,
    };
    use pretty_assertions::assert_eq;

    fn days_from(temperatures: &[f64]) -> Vec<DailyAggregate> {
        let text = epw_with_daily_temperatures(CalendarDate::FIRST, temperatures);
        EpwFile::parse(text.as_bytes()).unwrap().daily_aggregates().unwrap()
    }

    #[test]
    fn finds_the_hottest_stretch_of_a_year() {
        let mut temperatures = vec![15.0; 366];
        // Days 200..=202 of the year, 0-based indices 199..=201.
        temperatures[199] = 31.0;
        temperatures[200] = 33.0;
        temperatures[201] = 32.0;

        let window = hottest_window(&days_from(&temperatures), 3).unwrap();

        assert_eq!(window.start_index, 199);
        assert_eq!(window.start.ordinal(), 200);
        assert_eq!(window.end.ordinal(), 202);
        assert_eq!(window.length, 3);
        assert_eq!(window.mean_temperature, 32.0);
        assert_eq!(window.earliest_hot_day.ordinal(), 201);
        assert_eq!(window.days.len(), 3);
    }

    #[test]
    fn earliest_window_wins_ties() {
        let window = hottest_window(&days_from(&[20.1, 20.1, 20.1, 20.1, 20.1]), 2).unwrap();
        assert_eq!(window.start_index, 0);

        let window = hottest_window(&days_from(&[10.0, 30.0, 10.0, 30.0]), 1).unwrap();
        assert_eq!(window.start_index, 1);
        assert_eq!(window.earliest_hot_day, CalendarDate::new(1, 2).unwrap());
    }

    #[test]
    fn window_mean_is_maximal() {
        let temperatures = [12.0, 18.5, 17.0, 25.0, 9.0, 22.0, 23.5, 11.0];
        let days = days_from(&temperatures);
        let window = hottest_window(&days, 3).unwrap();

        for start in 0..=temperatures.len() - 3 {
            let mean = temperatures[start..start + 3].iter().sum::<f64>() / 3.0;
            assert!(window.mean_temperature + 1e-9 >= mean);
        }
        assert_eq!(window.start_index, 1);
    }

    #[test]
    fn window_may_cover_the_whole_series() {
        let window = hottest_window(&days_from(&[1.0, 2.0, 3.0]), 3).unwrap();
        assert_eq!(window.start, CalendarDate::FIRST);
        assert_eq!(window.mean_temperature, 2.0);
    }

    #[test]
    fn rejects_invalid_window_sizes() {
        let days = days_from(&[1.0, 2.0]);
        assert!(matches!(
            hottest_window(&days, 0),
            Err(WeatherError::InvalidWindowSize { requested: 0, available: 2 })
        ));
        assert!(matches!(
            hottest_window(&days, 3),
            Err(WeatherError::InvalidWindowSize { requested: 3, available: 2 })
        ));
    }
}
