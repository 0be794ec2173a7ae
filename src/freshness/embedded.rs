/// Sample dataset compiled into the binary, used when neither the network
/// nor durable storage can supply one.
pub const EMBEDDED_CSV: &str = "VIN,Unit
1FDDF6P84MKA55412,503006
JHHRDM2H1LK008183,700030
JHHRDM2H3LK008962,700093
JHHRDM2H4LK008162,700116
JHHRDM2H4LK008954,700121
JHHRDM2H6LK008972,700171
JHHRDM2H7LK008964,700196
1FDDF6P86MKA45383,503143
JALE5W160N7303550,820077
";

/// Number of data rows in [`EMBEDDED_CSV`].
pub const EMBEDDED_ROWS: usize = 9;
