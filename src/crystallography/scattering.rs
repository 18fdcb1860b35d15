//! # 散射长度与原子散射因子
//!
//! - X 射线：Cromer-Mann 参数化 f(s) = Σᵢ aᵢ exp(-bᵢ s²) + c，s = sin(θ)/λ
//! - 中子：相干散射长度（fm），与 s 无关
//!
//! ## 数据来源
//! - International Tables for Crystallography, Vol. C, Table 6.1.1.4
//! - V. F. Sears, Neutron News 3 (1992) 26
//!
//! ## 依赖关系
//! - 被 `analysis/calculators/kinematic.rs` 调用
//! - 纯静态数据，无外部依赖

/// X 射线散射因子参数，顺序 a1, b1, a2, b2, a3, b3, a4, b4, c
static XRAY_FORM_FACTORS: &[(&str, [f64; 9])] = &[
    ("H", [0.493002, 10.5109, 0.322912, 26.1257, 0.140191, 3.14236, 0.040810, 57.7997, 0.003038]),
    ("He", [0.8734, 9.1037, 0.6309, 3.3568, 0.3112, 22.9276, 0.1780, 0.9821, 0.0064]),
    ("Li", [1.1282, 3.9546, 0.7508, 1.0524, 0.6175, 85.3905, 0.4653, 168.261, 0.0377]),
    ("Be", [1.5919, 43.6427, 1.1278, 1.8623, 0.5391, 103.483, 0.7029, 0.5420, 0.0385]),
    ("B", [2.0545, 23.2185, 1.3326, 1.0210, 1.0979, 60.3498, 0.7068, 0.1403, -0.1932]),
    ("C", [2.3100, 20.8439, 1.0200, 10.2075, 1.5886, 0.5687, 0.8650, 51.6512, 0.2156]),
    ("N", [12.2126, 0.0057, 3.1322, 9.8933, 2.0125, 28.9975, 1.1663, 0.5826, -11.529]),
    ("O", [3.0485, 13.2771, 2.2868, 5.7011, 1.5463, 0.3239, 0.8670, 32.9089, 0.2508]),
    ("F", [3.5392, 10.2825, 2.6412, 4.2944, 1.5170, 0.2615, 1.0243, 26.1476, 0.2776]),
    ("Na", [4.7626, 3.2850, 3.1736, 8.8422, 1.2674, 0.3136, 1.1128, 129.424, 0.6760]),
    ("Mg", [5.4204, 2.8275, 2.1735, 79.2611, 1.2269, 0.3808, 2.3073, 7.1937, 0.8584]),
    ("Al", [6.4202, 3.0387, 1.9002, 0.7426, 1.5936, 31.5472, 1.9646, 85.0886, 1.1151]),
    ("Si", [6.2915, 2.4386, 3.0353, 32.3337, 1.9891, 0.6785, 1.5410, 81.6937, 1.1407]),
    ("P", [6.4345, 1.9067, 4.1791, 27.1570, 1.7800, 0.5260, 1.4908, 68.1645, 1.1149]),
    ("S", [6.9053, 1.4679, 5.2034, 22.2151, 1.4379, 0.2536, 1.5863, 56.1720, 0.8669]),
    ("Cl", [11.4604, 0.0104, 7.1964, 1.1662, 6.2556, 18.5194, 1.6455, 47.7784, -9.5574]),
    ("K", [8.2186, 12.7949, 7.4398, 0.7748, 1.0519, 213.187, 0.8659, 41.6841, 1.4228]),
    ("Ca", [8.6266, 10.4421, 7.3873, 0.6599, 1.5899, 85.7484, 1.0211, 178.437, 1.3751]),
    ("Ti", [9.7595, 7.8508, 7.3558, 0.5000, 1.6991, 35.6338, 1.9021, 116.105, 1.2807]),
    ("V", [10.2971, 6.8657, 7.3511, 0.4385, 2.0703, 26.8938, 2.0571, 102.478, 1.2199]),
    ("Cr", [10.6406, 6.1038, 7.3537, 0.3920, 3.3240, 20.2626, 1.4922, 98.7399, 1.1832]),
    ("Mn", [11.2819, 5.3409, 7.3573, 0.3432, 3.0193, 17.8674, 2.2441, 83.7543, 1.0896]),
    ("Fe", [11.7695, 4.7611, 7.3573, 0.3072, 3.5222, 15.3535, 2.3045, 76.8805, 1.0369]),
    ("Co", [12.2841, 4.2791, 7.3409, 0.2784, 4.0034, 13.5359, 2.3488, 71.1692, 1.0118]),
    ("Ni", [12.8376, 3.8785, 7.2920, 0.2565, 4.4438, 12.1763, 2.3800, 66.3421, 1.0341]),
    ("Cu", [13.3380, 3.5828, 7.1676, 0.2470, 5.6158, 11.3966, 1.6735, 64.8126, 1.1910]),
    ("Zn", [14.0743, 3.2655, 7.0318, 0.2333, 5.1652, 10.3163, 2.4100, 58.7097, 1.3041]),
    ("Ga", [15.2354, 3.0669, 6.7006, 0.2412, 4.3591, 10.7805, 2.9623, 61.4135, 1.7189]),
    ("Ge", [16.0816, 2.8509, 6.3747, 0.2516, 3.7068, 11.4468, 3.6830, 54.7625, 2.1313]),
    ("As", [16.6723, 2.6345, 6.0701, 0.2647, 3.4313, 12.9479, 4.2779, 47.7972, 2.531]),
    ("Se", [17.0006, 2.4098, 5.8196, 0.2726, 3.9731, 15.2372, 4.3543, 43.8163, 2.8409]),
    ("Br", [17.1789, 2.1723, 5.2358, 16.5796, 5.6377, 0.2609, 3.9851, 41.4328, 2.9557]),
    ("Rb", [17.5816, 1.7139, 7.6598, 14.7957, 5.8981, 0.1603, 2.7817, 31.2087, 2.0782]),
    ("Sr", [17.5663, 1.5564, 9.8184, 14.0988, 5.4220, 0.1664, 2.6694, 132.376, 2.5064]),
    ("Y", [17.7760, 1.4029, 10.2946, 12.8006, 5.7263, 0.1255, 3.2656, 104.354, 1.9341]),
    ("Zr", [17.8765, 1.2761, 10.9480, 11.9160, 5.4173, 0.1176, 3.6577, 87.6627, 2.0690]),
    ("Nb", [17.6142, 1.1886, 12.0144, 11.7660, 4.0418, 0.2047, 3.5334, 69.7957, 3.7553]),
    ("Mo", [3.7025, 0.2772, 17.2356, 1.0958, 12.8876, 11.0040, 3.7429, 61.6584, 4.3875]),
    ("Ag", [19.2808, 0.6446, 16.6885, 7.4726, 4.8045, 24.6605, 1.0463, 99.8156, 5.1790]),
    ("Ba", [20.3361, 3.2160, 19.2970, 0.2756, 10.8880, 20.2073, 2.6959, 167.202, 2.7731]),
    ("La", [20.5780, 2.9480, 19.5990, 0.2440, 11.3727, 18.7726, 3.2879, 133.124, 2.1461]),
    ("Ce", [21.1671, 2.8129, 19.7695, 0.2268, 11.8513, 17.6083, 3.3303, 127.113, 1.8623]),
    ("Au", [16.8819, 0.4611, 18.5913, 8.6216, 25.5582, 1.4826, 5.8600, 36.3956, 12.0658]),
    ("Pb", [31.0617, 0.6902, 13.0637, 2.3576, 18.4420, 8.6180, 5.9696, 47.2579, 13.4118]),
    ("Bi", [33.3689, 0.7040, 12.9510, 2.9238, 16.5877, 8.7937, 6.4692, 48.0093, 13.5782]),];

/// 中子相干散射长度 (fm)
static NEUTRON_LENGTHS: &[(&str, f64)] = &[
    ("H", -3.739),
    ("D", 6.671),
    ("He", 3.26),
    ("Li", -1.90),
    ("Be", 7.79),
    ("B", 5.30),
    ("C", 6.646),
    ("N", 9.36),
    ("O", 5.803),
    ("F", 5.654),
    ("Na", 3.63),
    ("Mg", 5.375),
    ("Al", 3.449),
    ("Si", 4.1491),
    ("P", 5.13),
    ("S", 2.847),
    ("Cl", 9.577),
    ("K", 3.67),
    ("Ca", 4.70),
    ("Ti", -3.438),
    ("V", -0.3824),
    ("Cr", 3.635),
    ("Mn", -3.73),
    ("Fe", 9.45),
    ("Co", 2.49),
    ("Ni", 10.3),
    ("Cu", 7.718),
    ("Zn", 5.68),
    ("Ga", 7.288),
    ("Ge", 8.185),
    ("As", 6.58),
    ("Se", 7.97),
    ("Br", 6.795),
    ("Rb", 7.09),
    ("Sr", 7.02),
    ("Y", 7.75),
    ("Zr", 7.16),
    ("Nb", 7.054),
    ("Mo", 6.715),
    ("Pd", 5.91),
    ("Ag", 5.922),
    ("Sn", 6.225),
    ("Cs", 5.42),
    ("Ba", 5.07),
    ("La", 8.24),
    ("Ce", 4.84),
    ("Nd", 7.69),
    ("Sm", 0.8),
    ("Eu", 7.22),
    ("Gd", 6.5),
    ("Tb", 7.38),
    ("Dy", 16.9),
    ("Ho", 8.01),
    ("Er", 7.79),
    ("Hf", 7.7),
    ("Ta", 6.91),
    ("W", 4.86),
    ("Pt", 9.60),
    ("Au", 7.63),
    ("Pb", 9.405),
    ("Bi", 8.532),];

/// 辐射探针对应的散射强度模型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Xray,
    Neutron,
}

/// 从类型符号中提取元素符号：`Fe3+` -> `Fe`，`O1` -> `O`，`SI` -> `Si`
pub fn element_symbol(type_symbol: &str) -> String {
    let letters: Vec<char> = type_symbol
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .take(2)
        .collect();
    let mut symbol = String::new();
    if let Some(first) = letters.first() {
        symbol.push(first.to_ascii_uppercase());
    }
    if let Some(second) = letters.get(1) {
        let two = format!("{}{}", symbol, second.to_ascii_lowercase());
        if is_known(&two) {
            return two;
        }
    }
    symbol
}

fn is_known(symbol: &str) -> bool {
    xray_params(symbol).is_some() || neutron_length(symbol).is_some()
}

/// X 射线散射因子参数
pub fn xray_params(symbol: &str) -> Option<&'static [f64; 9]> {
    XRAY_FORM_FACTORS
        .iter()
        .find(|(el, _)| *el == symbol)
        .map(|(_, p)| p)
}

/// 中子相干散射长度 (fm)
pub fn neutron_length(symbol: &str) -> Option<f64> {
    NEUTRON_LENGTHS
        .iter()
        .find(|(el, _)| *el == symbol)
        .map(|(_, b)| *b)
}

/// X 射线原子散射因子 f(s)
pub fn xray_form_factor(symbol: &str, s: f64) -> Option<f64> {
    let p = xray_params(symbol)?;
    let s2 = s * s;
    Some(
        p.chunks_exact(2)
            .map(|ab| ab[0] * (-ab[1] * s2).exp())
            .sum::<f64>()
            + p[8],
    )
}

/// 按探针返回散射幅度；未知元素返回 None
pub fn scattering_amplitude(type_symbol: &str, probe: Probe, s: f64) -> Option<f64> {
    let symbol = element_symbol(type_symbol);
    match probe {
        Probe::Xray => xray_form_factor(&symbol, s),
        Probe::Neutron => neutron_length(&symbol),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_factor_at_zero_is_close_to_z() {
        for (el, z) in [("Si", 14.0), ("Fe", 26.0), ("O", 8.0)] {
            let f0 = xray_form_factor(el, 0.0).unwrap();
            assert!((f0 - z).abs() < 1.0, "{} f(0) = {}", el, f0);
        }
    }

    #[test]
    fn test_form_factor_decreases() {
        let f0 = xray_form_factor("Cu", 0.0).unwrap();
        let f1 = xray_form_factor("Cu", 0.5).unwrap();
        assert!(f1 < f0);
    }

    #[test]
    fn test_element_symbol() {
        assert_eq!(element_symbol("Fe3+"), "Fe");
        assert_eq!(element_symbol("O1"), "O");
        assert_eq!(element_symbol("SI"), "Si");
        assert_eq!(element_symbol("Co"), "Co");
        assert_eq!(element_symbol("Cx"), "C");
    }

    #[test]
    fn test_neutron_lengths() {
        assert_eq!(neutron_length("Si"), Some(4.1491));
        assert!(neutron_length("H").unwrap() < 0.0);
        assert_eq!(scattering_amplitude("La3+", Probe::Neutron, 0.3), Some(8.24));
        assert!(scattering_amplitude("Xx", Probe::Neutron, 0.0).is_none());
    }
}
