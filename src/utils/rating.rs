// 达成率与 DX Rating 相关的纯函数。
//
// 倍率表与取整方式参照:
// https://listed.to/@donmai/45107/exploring-the-algorithm-behind-maimai-dx-s-scoring-and-dx-rating-computation
// https://silentblue.remywiki.com/maimai_DX:Rating

// 达成率（×10^4 定点）对应的评级
pub fn score_to_rank(score: i64) -> &'static str {
    match score {
        s if s >= 100_5000 => "SSS+",
        s if s >= 100_0000 => "SSS",
        s if s >= 99_5000 => "SS+",
        s if s >= 99_0000 => "SS",
        s if s >= 98_0000 => "S+",
        s if s >= 97_0000 => "S",
        s if s >= 94_0000 => "AAA",
        s if s >= 90_0000 => "AA",
        s if s >= 80_0000 => "A",
        s if s >= 75_0000 => "BBB",
        s if s >= 70_0000 => "BB",
        s if s >= 60_0000 => "B",
        s if s >= 50_0000 => "C",
        _ => "D",
    }
}

// 达成率到 Rating 倍率的阶梯映射。
// 注意 100.4999 / 99.9999 / 98.9999 / 96.9999 / 79.9999 这几个
// "肩部" 档位是官方算法刻意设置的，不是单调阶梯。
fn score_to_multiplier(score: i64) -> f64 {
    match score {
        s if s >= 100_5000 => 22.4,
        s if s >= 100_4999 => 22.2,
        s if s >= 100_0000 => 21.6,
        s if s >= 99_9999 => 21.4,
        s if s >= 99_5000 => 21.1,
        s if s >= 99_0000 => 20.8,
        s if s >= 98_9999 => 20.6,
        s if s >= 98_0000 => 20.3,
        s if s >= 97_0000 => 20.0,
        s if s >= 96_9999 => 17.6,
        s if s >= 94_0000 => 16.8,
        s if s >= 90_0000 => 15.2,
        s if s >= 80_0000 => 13.6,
        s if s >= 79_9999 => 12.8,
        s if s >= 75_0000 => 12.0,
        s if s >= 70_0000 => 11.2,
        s if s >= 60_0000 => 9.6,
        s if s >= 50_0000 => 8.0,
        s if s >= 40_0000 => 6.4,
        s if s >= 30_0000 => 4.8,
        s if s >= 20_0000 => 3.2,
        s if s >= 10_0000 => 1.6,
        _ => 0.0,
    }
}

/// 由达成率（×10^4 定点）和谱面定数（×10 定点）计算第三代 DX Rating。
/// 乘法在 f64 上进行，最后向下取整（不是四舍五入）。
pub fn dx_rating_gen3(score: i64, internal_level: i64) -> i64 {
    let mult = score_to_multiplier(score);
    let sc = score as f64 / 1_000_000.0;
    let lvl = internal_level as f64 / 10.0;

    (mult * sc * lvl).floor() as i64
}
