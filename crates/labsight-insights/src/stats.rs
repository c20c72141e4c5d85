//! 통계 커널 — 모든 분석기가 공유하는 순수 함수.
//!
//! 퇴화 입력(빈 입력, 분산 0, 분모 0)은 NaN/Infinity 대신 0을 반환한다.

/// 산술 평균 (빈 입력이면 0)
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// 모분산 `Σ(x-mean)²/n` (빈 입력이면 0)
pub fn variance(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    let m = mean(xs);
    xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64
}

/// 모표준편차
pub fn std_dev(xs: &[f64]) -> f64 {
    variance(xs).sqrt()
}

/// z-score — 표준편차가 0이면 0
pub fn z_score(x: f64, mean: f64, std_dev: f64) -> f64 {
    if std_dev == 0.0 {
        return 0.0;
    }
    (x - mean) / std_dev
}

/// 최소제곱 기울기 `(nΣxy - ΣxΣy) / (nΣx² - (Σx)²)`
///
/// 포인트가 2개 미만이거나 x가 모두 같아 분모가 0이면 0.
pub fn linear_slope(points: &[(f64, f64)]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let n = points.len() as f64;
    let (sum_x, sum_y, sum_xy, sum_x2) = points.iter().fold(
        (0.0, 0.0, 0.0, 0.0),
        |(sx, sy, sxy, sx2), &(x, y)| (sx + x, sy + y, sxy + x * y, sx2 + x * x),
    );

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

/// 값 목록을 `(인덱스, 값)` 포인트로 변환
pub fn indexed(ys: &[f64]) -> Vec<(f64, f64)> {
    ys.iter().enumerate().map(|(i, &y)| (i as f64, y)).collect()
}

/// 최소값 (빈 입력이면 0)
pub fn min(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().copied().fold(f64::INFINITY, f64::min)
}

/// 최대값 (빈 입력이면 0)
pub fn max(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// `|a-b|/b*100` — 기준값이 0이면 0
pub fn percent_deviation(value: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        return 0.0;
    }
    (value - baseline).abs() / baseline * 100.0
}

/// `(a-b)/b*100` — 기준값이 0이면 0
pub fn percent_change(value: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        return 0.0;
    }
    (value - baseline) / baseline * 100.0
}
