//! 종가/이동평균 터미널 차트.
//!
//! `ratatui` 차트 위젯을 화면 밖 버퍼에 그린 뒤 텍스트로 옮깁니다.

use super::report::TickerReport;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::symbols;
use ratatui::text::Span;
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, Widget};

/// 기본 차트 너비 (열)
pub const DEFAULT_CHART_WIDTH: u16 = 80;
/// 기본 차트 높이 (행)
pub const DEFAULT_CHART_HEIGHT: u16 = 20;

const MIN_WIDTH: u16 = 20;
const MIN_HEIGHT: u16 = 5;

impl TickerReport {
    /// 종가와 MA7을 선 차트로 그립니다.
    ///
    /// 데이터가 없으면 차트 대신 한 줄 안내문을 반환합니다.
    pub fn render_chart(&self, width: u16, height: u16) -> String {
        if self.bars.is_empty() {
            return format!("{}: 차트에 표시할 데이터 없음\n", self.ticker);
        }

        let close: Vec<(f64, f64)> = self
            .bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (i as f64, bar.close))
            .collect();
        let ma7: Vec<(f64, f64)> = self
            .bars
            .iter()
            .enumerate()
            .filter_map(|(i, bar)| bar.ma7.map(|v| (i as f64, v)))
            .collect();

        let (min_y, max_y) = close
            .iter()
            .chain(&ma7)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, y)| {
                (lo.min(y), hi.max(y))
            });
        let padding = match (max_y - min_y).abs() * 0.05 {
            p if p > 0.0 => p,
            _ => 1.0,
        };
        let (y_min, y_max) = (min_y - padding, max_y + padding);
        let x_max = (self.bars.len().saturating_sub(1) as f64).max(1.0);

        let first = self.bars.first().map(|b| b.date.to_string()).unwrap_or_default();
        let last = self.bars.last().map(|b| b.date.to_string()).unwrap_or_default();

        let datasets = vec![
            Dataset::default()
                .name("Close")
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .data(&close),
            Dataset::default()
                .name("MA7")
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Line)
                .data(&ma7),
        ];

        let chart = Chart::new(datasets)
            .x_axis(
                Axis::default()
                    .bounds([0.0, x_max])
                    .labels(vec![Span::raw(first), Span::raw(last)]),
            )
            .y_axis(
                Axis::default()
                    .title(self.ticker.to_string())
                    .bounds([y_min, y_max])
                    .labels(vec![
                        Span::raw(format!("{:.2}", y_min)),
                        Span::raw(format!("{:.2}", y_max)),
                    ]),
            );

        let area = Rect::new(0, 0, width.max(MIN_WIDTH), height.max(MIN_HEIGHT));
        let mut buffer = Buffer::empty(area);
        chart.render(area, &mut buffer);

        buffer_to_text(&buffer)
    }
}

/// 버퍼를 줄 단위 텍스트로 변환 (줄 끝 공백 제거)
fn buffer_to_text(buffer: &Buffer) -> String {
    let width = usize::from(buffer.area.width.max(1));
    let mut out = String::new();
    for row in buffer.content.chunks(width) {
        let line: String = row.iter().map(|cell| cell.symbol()).collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
