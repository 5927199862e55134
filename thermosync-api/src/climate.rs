pub fn fahrenheit_from_celsius(celsius: f64) -> f64 {
    celsius * 1.8 + 32.0
}

/// Apparent temperature in °F for a dry-bulb temperature in °F and a
/// relative humidity in percent.
///
/// The Steadman approximation is used while it stays below 80°F. Past that
/// the Rothfusz regression applies, with the NWS corrections for very dry
/// (< 13%) and very humid (> 85%) air between 80°F and 112°F.
pub fn heat_index(temp: f64, humidity: f64) -> f64 {
    let simple = 0.5 * (temp + 61.0 + (temp - 68.0) * 1.2 + humidity * 0.094);
    if simple < 80.0 {
        return simple;
    }

    let t2 = temp * temp;
    let h2 = humidity * humidity;
    let mut index = -42.379 + 2.04901523 * temp + 10.14333127 * humidity
        - 0.22475541 * temp * humidity
        - 0.00683783 * t2
        - 0.05481717 * h2
        + 0.00122874 * t2 * humidity
        + 0.00085282 * temp * h2
        - 0.00000199 * t2 * h2;

    if humidity < 13.0 && (80.0..=112.0).contains(&temp) {
        index -= (13.0 - humidity) / 4.0 * ((17.0 - (temp - 95.0).abs()) / 17.0).sqrt();
    }
    if humidity > 85.0 && (80.0..87.0).contains(&temp) {
        index += (humidity - 85.0) / 10.0 * (87.0 - temp) / 5.0;
    }

    index
}
